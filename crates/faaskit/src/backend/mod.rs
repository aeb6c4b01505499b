//! Backend traits and implementations for the control-plane API.
//!
//! This module provides the [`Backend`] trait and two implementations:
//! [`http::HttpBackend`], which talks to the real API over HTTPS, and
//! [`MockBackend`], an in-memory control plane for tests.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access. Clones share
//! state, so a test can hand one clone to the code under test and inspect
//! the recorded calls through another:
//!
//! ```
//! use faaskit::backend::{Backend, MockBackend, Verb};
//! use faaskit::FunctionCreateRequest;
//!
//! let mock = MockBackend::new();
//! let created = mock
//!     .create_function(&FunctionCreateRequest {
//!         name: "hello".to_string(),
//!         runtime: "python3.11".to_string(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! assert_eq!(mock.get_function(&created.id).unwrap().name, "hello");
//! assert_eq!(mock.count(Verb::CreateFunction), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    FunctionCodeUpdateRequest, FunctionConfigUpdateRequest, FunctionCreateRequest,
    FunctionEnvUpdateRequest, FunctionList, FunctionMetadataUpdateRequest, FunctionResponse,
    FunctionStatus, Runtime, RuntimeCatalog, SecretCreateRequest, SecretResponse,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend trait for the control-plane verbs.
///
/// Implementations must be safe to share between threads; the host may
/// reconcile several resources at once against one backend.
pub trait Backend: Send + Sync {
    /// Create a function. Returns the server's view, including its new id.
    fn create_function(&self, req: &FunctionCreateRequest) -> Result<FunctionResponse>;

    /// Fetch a function by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the function does not exist.
    fn get_function(&self, id: &str) -> Result<FunctionResponse>;

    /// List all functions visible to the caller.
    fn list_functions(&self) -> Result<FunctionList>;

    /// Replace code, handler and requirements of a function.
    fn update_function_code(
        &self,
        id: &str,
        req: &FunctionCodeUpdateRequest,
    ) -> Result<FunctionResponse>;

    /// Change memory, timeout and replica count of a function.
    fn update_function_config(
        &self,
        id: &str,
        req: &FunctionConfigUpdateRequest,
    ) -> Result<FunctionResponse>;

    /// Replace environment variables and secret bindings of a function.
    fn update_function_environment(
        &self,
        id: &str,
        req: &FunctionEnvUpdateRequest,
    ) -> Result<FunctionResponse>;

    /// Replace labels and annotations of a function.
    fn update_function_metadata(
        &self,
        id: &str,
        req: &FunctionMetadataUpdateRequest,
    ) -> Result<FunctionResponse>;

    /// Delete a function. Deleting a function that does not exist succeeds.
    fn delete_function(&self, id: &str) -> Result<()>;

    /// Create a secret.
    fn create_secret(&self, req: &SecretCreateRequest) -> Result<SecretResponse>;

    /// Delete a secret by name. Deleting a missing secret succeeds.
    fn delete_secret(&self, name: &str) -> Result<()>;

    /// List the runtime catalog.
    fn list_runtimes(&self) -> Result<RuntimeCatalog>;
}

/// Verbs understood by [`Backend`], used to inspect and script the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    CreateFunction,
    GetFunction,
    ListFunctions,
    UpdateCode,
    UpdateConfig,
    UpdateEnvironment,
    UpdateMetadata,
    DeleteFunction,
    CreateSecret,
    DeleteSecret,
    ListRuntimes,
}

/// A call recorded by [`MockBackend`], with its request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateFunction(FunctionCreateRequest),
    GetFunction(String),
    ListFunctions,
    UpdateCode {
        id: String,
        request: FunctionCodeUpdateRequest,
    },
    UpdateConfig {
        id: String,
        request: FunctionConfigUpdateRequest,
    },
    UpdateEnvironment {
        id: String,
        request: FunctionEnvUpdateRequest,
    },
    UpdateMetadata {
        id: String,
        request: FunctionMetadataUpdateRequest,
    },
    DeleteFunction(String),
    CreateSecret(SecretCreateRequest),
    DeleteSecret(String),
    ListRuntimes,
}

impl Call {
    /// The verb this call was made with.
    #[must_use]
    pub fn verb(&self) -> Verb {
        match self {
            Call::CreateFunction(_) => Verb::CreateFunction,
            Call::GetFunction(_) => Verb::GetFunction,
            Call::ListFunctions => Verb::ListFunctions,
            Call::UpdateCode { .. } => Verb::UpdateCode,
            Call::UpdateConfig { .. } => Verb::UpdateConfig,
            Call::UpdateEnvironment { .. } => Verb::UpdateEnvironment,
            Call::UpdateMetadata { .. } => Verb::UpdateMetadata,
            Call::DeleteFunction(_) => Verb::DeleteFunction,
            Call::CreateSecret(_) => Verb::CreateSecret,
            Call::DeleteSecret(_) => Verb::DeleteSecret,
            Call::ListRuntimes => Verb::ListRuntimes,
        }
    }

    /// Whether this call changes one of the four update groups.
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(
            self.verb(),
            Verb::UpdateCode | Verb::UpdateConfig | Verb::UpdateEnvironment | Verb::UpdateMetadata
        )
    }
}

#[derive(Debug)]
struct MockState {
    functions: BTreeMap<String, FunctionResponse>,
    /// Statuses still to be reported by `get_function`, per function id.
    pending: HashMap<String, VecDeque<FunctionStatus>>,
    /// Status sequence a function goes through after every create or update.
    rollout: Vec<FunctionStatus>,
    failure_message: Option<String>,
    /// Number of `get_function` calls a deleted function stays visible for.
    delete_lag: usize,
    deleting: HashMap<String, usize>,
    secrets: BTreeMap<String, SecretResponse>,
    runtimes: Vec<Runtime>,
    failures: HashMap<Verb, VecDeque<Error>>,
    calls: Vec<Call>,
    next_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            functions: BTreeMap::new(),
            pending: HashMap::new(),
            rollout: vec![FunctionStatus::Running],
            failure_message: None,
            delete_lag: 0,
            deleting: HashMap::new(),
            secrets: BTreeMap::new(),
            runtimes: Vec::new(),
            failures: HashMap::new(),
            calls: Vec::new(),
            next_id: 1,
        }
    }
}

impl MockState {
    fn record(&mut self, call: Call) -> Result<()> {
        let verb = call.verb();
        self.calls.push(call);
        match self.failures.get_mut(&verb).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start_rollout(&mut self, id: &str) {
        if let Some(function) = self.functions.get_mut(id) {
            function.status = FunctionStatus::Deploying;
            function.error_message = None;
        }
        self.pending
            .insert(id.to_string(), self.rollout.iter().cloned().collect());
    }

    fn function_mut(&mut self, operation: &'static str, id: &str) -> Result<&mut FunctionResponse> {
        self.functions
            .get_mut(id)
            .ok_or_else(|| Error::http(operation, 404, format!("function {id} not found")))
    }

    fn bump_version(function: &mut FunctionResponse) {
        let current = function
            .version
            .trim_start_matches('v')
            .parse::<u32>()
            .unwrap_or(0);
        function.version = format!("v{}", current + 1);
        function.updated_at = "2026-01-01T00:05:00Z".to_string();
    }
}

/// In-memory control plane for testing without network access.
///
/// Functions move through a configurable rollout (see
/// [`MockBackend::set_rollout`]) after every create or update; each
/// `get_function` call consumes one status of that rollout. Every call is
/// recorded and errors can be queued per verb with
/// [`MockBackend::fail_next`].
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend whose functions are `Running` on the
    /// first status check.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a mock backend pre-configured with a small runtime catalog.
    #[must_use]
    pub fn with_runtimes() -> Self {
        let mock = Self::new();
        mock.set_runtimes(vec![
            Runtime {
                name: "python3.11".to_string(),
                version: "3.11".to_string(),
                templates: vec!["http".to_string(), "flask".to_string(), "fastapi".to_string()],
                hardware: vec!["cpu".to_string()],
            },
            Runtime {
                name: "node20".to_string(),
                version: "20".to_string(),
                templates: vec!["node".to_string()],
                hardware: vec!["cpu".to_string()],
            },
            Runtime {
                name: "pytorch2.1.2".to_string(),
                version: "2.1.2".to_string(),
                templates: vec!["http".to_string()],
                hardware: vec!["cpu".to_string(), "gpu".to_string()],
            },
            Runtime {
                name: "tensorflow2.19.0".to_string(),
                version: "2.19.0".to_string(),
                templates: vec!["http".to_string()],
                hardware: vec!["gpu".to_string()],
            },
        ]);
        mock
    }

    /// Set the status sequence reported after each create or update.
    ///
    /// The last status sticks once the sequence is exhausted.
    pub fn set_rollout<S: Into<FunctionStatus>>(&self, statuses: impl IntoIterator<Item = S>) {
        let mut state = self.lock();
        state.rollout = statuses.into_iter().map(Into::into).collect();
    }

    /// Set the error message reported alongside a `Failed` status.
    pub fn set_failure_message(&self, message: impl Into<String>) {
        self.lock().failure_message = Some(message.into());
    }

    /// Keep deleted functions visible for `gets` further status checks.
    pub fn set_delete_lag(&self, gets: usize) {
        self.lock().delete_lag = gets;
    }

    /// Replace the runtime catalog.
    pub fn set_runtimes(&self, runtimes: Vec<Runtime>) {
        self.lock().runtimes = runtimes;
    }

    /// Make the next call of `verb` fail with `err`. Queued errors are
    /// consumed in order.
    pub fn fail_next(&self, verb: Verb, err: Error) {
        let mut state = self.lock();
        state.failures.entry(verb).or_default().push_back(err);
    }

    /// Add a function directly, bypassing the rollout.
    pub fn insert_function(&self, function: FunctionResponse) {
        let mut state = self.lock();
        state.functions.insert(function.id.clone(), function);
    }

    /// Remove a function as if it was deleted out of band.
    pub fn remove_function(&self, id: &str) {
        let mut state = self.lock();
        state.functions.remove(id);
        state.pending.remove(id);
    }

    /// Current server-side view of a function, without recording a call.
    #[must_use]
    pub fn function(&self, id: &str) -> Option<FunctionResponse> {
        self.lock().functions.get(id).cloned()
    }

    /// Names of the secrets currently stored.
    #[must_use]
    pub fn secret_names(&self) -> Vec<String> {
        self.lock().secrets.keys().cloned().collect()
    }

    /// All recorded calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Recorded calls of one verb.
    #[must_use]
    pub fn calls_for(&self, verb: Verb) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.verb() == verb).collect()
    }

    /// Number of recorded calls of one verb.
    #[must_use]
    pub fn count(&self, verb: Verb) -> usize {
        self.calls_for(verb).len()
    }

    /// Forget all recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl Backend for MockBackend {
    fn create_function(&self, req: &FunctionCreateRequest) -> Result<FunctionResponse> {
        let mut state = self.lock();
        state.record(Call::CreateFunction(req.clone()))?;

        let id = format!("fn-{:04}", state.next_id);
        state.next_id += 1;

        let function = FunctionResponse {
            id: id.clone(),
            name: req.name.clone(),
            namespace: "default".to_string(),
            runtime: req.runtime.clone(),
            template: req.template.clone(),
            handler_function: req.handler_function.clone(),
            invoke_url: format!("https://faas.mock.invalid/default/{}", req.name),
            status: FunctionStatus::Deploying,
            version: "v1".to_string(),
            error_message: None,
            config: req.config.clone(),
            environment: Some(req.environment.clone()),
            secrets: Some(req.secrets.clone()),
            labels: Some(req.labels.clone()),
            annotations: Some(req.annotations.clone()),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            invocation_count: 0,
        };
        state.functions.insert(id.clone(), function.clone());
        state.start_rollout(&id);
        Ok(function)
    }

    fn get_function(&self, id: &str) -> Result<FunctionResponse> {
        let mut state = self.lock();
        state.record(Call::GetFunction(id.to_string()))?;

        if let Some(remaining) = state.deleting.get_mut(id) {
            if *remaining == 0 {
                state.deleting.remove(id);
                state.functions.remove(id);
                state.pending.remove(id);
            } else {
                *remaining -= 1;
            }
        }

        let next = state.pending.get_mut(id).and_then(|queue| {
            // The last status sticks.
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });
        let failure_message = state.failure_message.clone();

        let function = state
            .functions
            .get_mut(id)
            .ok_or_else(|| Error::function_not_found(id))?;
        if let Some(status) = next {
            if status.is_failed() {
                function.error_message.clone_from(&failure_message);
            }
            function.status = status;
        }
        Ok(function.clone())
    }

    fn list_functions(&self) -> Result<FunctionList> {
        let mut state = self.lock();
        state.record(Call::ListFunctions)?;
        let functions: Vec<FunctionResponse> = state.functions.values().cloned().collect();
        Ok(FunctionList {
            total: functions.len(),
            functions,
        })
    }

    fn update_function_code(
        &self,
        id: &str,
        req: &FunctionCodeUpdateRequest,
    ) -> Result<FunctionResponse> {
        let mut state = self.lock();
        state.record(Call::UpdateCode {
            id: id.to_string(),
            request: req.clone(),
        })?;
        let function = state.function_mut("update function code", id)?;
        if !req.handler_function.is_empty() {
            function.handler_function.clone_from(&req.handler_function);
        }
        MockState::bump_version(function);
        let snapshot = function.clone();
        state.start_rollout(id);
        Ok(snapshot)
    }

    fn update_function_config(
        &self,
        id: &str,
        req: &FunctionConfigUpdateRequest,
    ) -> Result<FunctionResponse> {
        let mut state = self.lock();
        state.record(Call::UpdateConfig {
            id: id.to_string(),
            request: req.clone(),
        })?;
        let function = state.function_mut("update function config", id)?;
        let hardware_type = function
            .config
            .as_ref()
            .map(|c| c.hardware_type.clone())
            .unwrap_or_else(|| "cpu".to_string());
        function.config = Some(crate::types::FunctionConfig {
            memory_mb: req.memory_mb,
            timeout_seconds: req.timeout_seconds,
            replicas: req.replicas,
            hardware_type,
        });
        MockState::bump_version(function);
        let snapshot = function.clone();
        state.start_rollout(id);
        Ok(snapshot)
    }

    fn update_function_environment(
        &self,
        id: &str,
        req: &FunctionEnvUpdateRequest,
    ) -> Result<FunctionResponse> {
        let mut state = self.lock();
        state.record(Call::UpdateEnvironment {
            id: id.to_string(),
            request: req.clone(),
        })?;
        let function = state.function_mut("update function environment", id)?;
        function.environment = Some(req.environment.clone());
        function.secrets = Some(req.secrets.clone());
        MockState::bump_version(function);
        let snapshot = function.clone();
        state.start_rollout(id);
        Ok(snapshot)
    }

    fn update_function_metadata(
        &self,
        id: &str,
        req: &FunctionMetadataUpdateRequest,
    ) -> Result<FunctionResponse> {
        let mut state = self.lock();
        state.record(Call::UpdateMetadata {
            id: id.to_string(),
            request: req.clone(),
        })?;
        let function = state.function_mut("update function metadata", id)?;
        function.labels = Some(req.labels.clone());
        function.annotations = Some(req.annotations.clone());
        MockState::bump_version(function);
        let snapshot = function.clone();
        state.start_rollout(id);
        Ok(snapshot)
    }

    fn delete_function(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::DeleteFunction(id.to_string()))?;
        if !state.functions.contains_key(id) {
            return Ok(());
        }
        if state.delete_lag == 0 {
            state.functions.remove(id);
            state.pending.remove(id);
        } else {
            let lag = state.delete_lag;
            state.deleting.insert(id.to_string(), lag);
        }
        Ok(())
    }

    fn create_secret(&self, req: &SecretCreateRequest) -> Result<SecretResponse> {
        let mut state = self.lock();
        state.record(Call::CreateSecret(req.clone()))?;
        if state.secrets.contains_key(&req.name) {
            return Err(Error::http(
                "create secret",
                409,
                format!("secret {} already exists", req.name),
            ));
        }
        let secret = SecretResponse {
            id: format!("sec-{:04}", state.next_id),
            name: req.name.clone(),
            namespace: req.namespace.clone().unwrap_or_else(|| "default".to_string()),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        state.next_id += 1;
        state.secrets.insert(req.name.clone(), secret.clone());
        Ok(secret)
    }

    fn delete_secret(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::DeleteSecret(name.to_string()))?;
        state.secrets.remove(name);
        Ok(())
    }

    fn list_runtimes(&self) -> Result<RuntimeCatalog> {
        let mut state = self.lock();
        state.record(Call::ListRuntimes)?;
        Ok(RuntimeCatalog {
            runtimes: state.runtimes.clone(),
        })
    }
}
