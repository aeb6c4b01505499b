//! Create, read, update and delete of functions against the control plane.
//!
//! Every operation is blocking and sequential. Long-running rollouts are
//! awaited with [`declarative::wait_until`], bounded by the per-operation
//! timeout and interruptible through a [`Cancellation`].

use super::changes::{ChangeGroup, ChangeSet, replace_reasons, unmanaged_changes};
use super::translate::{self, CodePayload};
use super::{CodeSource, FunctionSpec, FunctionState};
use crate::archive::zip_directory;
use crate::config::Timeouts;
use crate::error::{ProviderError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use declarative::{Cancellation, Poll, WaitError, WaitPolicy, wait_until};
use faaskit::{Client, FunctionStatus};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_FAILURE_MESSAGE: &str = "deployment failed";

/// Reconciles single functions. Cheap to clone and share across threads.
#[derive(Clone)]
pub struct FunctionEngine {
    client: Arc<Client>,
    timeouts: Timeouts,
    pacing: WaitPolicy,
}

impl FunctionEngine {
    /// `pacing` sets the poll interval and backoff; its timeout is replaced
    /// by the matching entry of `timeouts` for each operation.
    pub fn new(client: Arc<Client>, timeouts: Timeouts, pacing: WaitPolicy) -> Self {
        Self {
            client,
            timeouts,
            pacing,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Handle on the client for resources that call it directly
    pub fn shared_client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    /// Create a function and wait until it is running.
    ///
    /// `on_created` receives the server's first answer as soon as the
    /// create call returns, before any waiting, so the caller can record the
    /// identity. If it fails, nothing else is attempted. A failed rollout
    /// still leaves the function in place.
    pub fn create(
        &self,
        spec: &FunctionSpec,
        cancel: &Cancellation,
        on_created: impl FnOnce(&FunctionState) -> Result<()>,
    ) -> Result<FunctionState> {
        let code = resolve_code(spec.code.as_ref())?;
        let request = translate::create_request(spec, code.as_ref());

        log::debug!("Creating function {} ({})", spec.name, spec.runtime);
        let created = self
            .client
            .create_function(&request)
            .map_err(ProviderError::transport("create function"))?;
        let created = translate::flatten(created);
        let id = created.id.clone();
        log::info!("Created function {} with id {id}", spec.name);

        on_created(&created)?;

        self.wait_running(&id, self.timeouts.create, cancel)?;
        self.read(&id)?.ok_or(ProviderError::NotFound { id })
    }

    /// Fetch the current state. `None` if the function no longer exists.
    pub fn read(&self, id: &str) -> Result<Option<FunctionState>> {
        match self.client.get_function(id) {
            Ok(response) => Ok(Some(translate::flatten(response))),
            Err(e) if e.is_not_found() => {
                log::debug!("Function {id} not found");
                Ok(None)
            }
            Err(e) => Err(ProviderError::transport("get function")(e)),
        }
    }

    /// Send one update per changed group, wait for the rollout, and read back.
    ///
    /// Groups go out in a fixed order and are not rolled back: if a later
    /// call fails, earlier groups stay applied remotely. With nothing to
    /// change no update is sent and no wait happens.
    pub fn update(
        &self,
        id: &str,
        previous: &FunctionSpec,
        next: &FunctionSpec,
        cancel: &Cancellation,
    ) -> Result<FunctionState> {
        let forced = replace_reasons(previous, next);
        if !forced.is_empty() {
            return Err(ProviderError::Validation(format!(
                "function {}: {} cannot change in place",
                previous.name,
                forced.join(", ")
            )));
        }
        for field in unmanaged_changes(previous, next) {
            log::debug!("Function {}: {field} changed but is not sent", next.name);
        }

        let changes = ChangeSet::between(previous, next);
        let code = if changes.contains(ChangeGroup::Code) {
            resolve_code(next.code.as_ref())?
        } else {
            None
        };

        for group in changes.iter() {
            log::debug!("Updating {group} of function {id}");
            let sent = match group {
                ChangeGroup::Code => self
                    .client
                    .update_function_code(id, &translate::code_update_request(next, code.as_ref()))
                    .map_err(ProviderError::transport("update function code")),
                ChangeGroup::Config => {
                    let config = next.config.unwrap_or_default();
                    self.client
                        .update_function_config(id, &translate::config_update_request(&config))
                        .map_err(ProviderError::transport("update function config"))
                }
                ChangeGroup::Environment => self
                    .client
                    .update_function_environment(id, &translate::environment_update_request(next))
                    .map_err(ProviderError::transport("update function environment")),
                ChangeGroup::Metadata => self
                    .client
                    .update_function_metadata(id, &translate::metadata_update_request(next))
                    .map_err(ProviderError::transport("update function metadata")),
            };
            sent?;
        }

        if !changes.is_empty() {
            self.wait_running(id, self.timeouts.update, cancel)?;
        }
        self.read(id)?.ok_or_else(|| ProviderError::NotFound { id: id.to_string() })
    }

    /// Delete and wait until the function is gone. Already gone is success.
    pub fn delete(&self, id: &str, cancel: &Cancellation) -> Result<()> {
        log::debug!("Deleting function {id}");
        match self.client.delete_function(id) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => log::debug!("Function {id} already gone"),
            Err(e) => return Err(ProviderError::transport("delete function")(e)),
        }
        self.wait_gone(id, cancel)
    }

    /// Look a function up by name, for import.
    pub fn find_by_name(&self, name: &str) -> Result<Option<FunctionState>> {
        let found = self
            .client
            .find_function(name)
            .map_err(ProviderError::transport("list functions"))?;
        Ok(found.map(translate::flatten))
    }

    fn policy(&self, timeout: Duration) -> WaitPolicy {
        WaitPolicy {
            timeout,
            ..self.pacing
        }
    }

    fn wait_running(&self, id: &str, timeout: Duration, cancel: &Cancellation) -> Result<()> {
        let outcome = wait_until(&self.policy(timeout), cancel, || {
            let function = self
                .client
                .get_function(id)
                .map_err(ProviderError::transport("get function"))?;
            match function.status {
                FunctionStatus::Running => Ok(Poll::Ready(())),
                FunctionStatus::Failed => Err(ProviderError::DeploymentFailed {
                    id: id.to_string(),
                    message: function
                        .error_message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                }),
                other => Ok(Poll::Pending(other.to_string())),
            }
        });
        outcome.map_err(|e| wait_error(id, "Running", e))
    }

    fn wait_gone(&self, id: &str, cancel: &Cancellation) -> Result<()> {
        let outcome = wait_until(&self.policy(self.timeouts.delete), cancel, || {
            match self.client.get_function(id) {
                Ok(function) => Ok(Poll::Pending(function.status.to_string())),
                Err(e) if e.is_not_found() => Ok(Poll::Ready(())),
                Err(e) => Err(ProviderError::transport("get function")(e)),
            }
        });
        outcome.map_err(|e| wait_error(id, "deleted", e))
    }
}

impl std::fmt::Debug for FunctionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionEngine")
            .field("timeouts", &self.timeouts)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

fn wait_error(id: &str, target: &'static str, err: WaitError<ProviderError>) -> ProviderError {
    match err {
        WaitError::Timeout {
            elapsed,
            last_status,
        } => ProviderError::Timeout {
            id: id.to_string(),
            target,
            elapsed,
            last_status,
        },
        WaitError::Cancelled => ProviderError::Cancelled { id: id.to_string() },
        WaitError::Failed(e) => e,
    }
}

/// Turn a code source into what goes on the wire.
///
/// Archives are read from disk and directories zipped, both base64-encoded.
pub fn resolve_code(code: Option<&CodeSource>) -> Result<Option<CodePayload>> {
    let payload = match code {
        None => return Ok(None),
        Some(CodeSource::Inline(text)) => CodePayload::Inline(text.clone()),
        Some(CodeSource::Archive(path)) => {
            let bytes = fs::read(path).map_err(|source| ProviderError::Io {
                path: path.clone(),
                source,
            })?;
            CodePayload::Archive(STANDARD.encode(bytes))
        }
        Some(CodeSource::Directory(dir)) => CodePayload::Archive(STANDARD.encode(zip_directory(dir)?)),
    };
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::translate::spec_from_state;
    use crate::function::{FunctionConfig, HardwareType, RuntimeKind};
    use crate::schema::Manifest;
    use base64::Engine as _;
    use faaskit::{Backend, Call, FunctionCreateRequest, MockBackend, Verb};
    use std::cell::RefCell;
    use std::path::Path;
    use std::thread;
    use tempfile::TempDir;

    fn engine(mock: &MockBackend) -> FunctionEngine {
        let timeouts = Timeouts {
            create: Duration::from_millis(200),
            update: Duration::from_millis(200),
            delete: Duration::from_millis(200),
        };
        FunctionEngine::new(
            Arc::new(Client::with_backend(Box::new(mock.clone()))),
            timeouts,
            WaitPolicy::fixed(Duration::ZERO, Duration::from_millis(1)),
        )
    }

    fn basic_spec() -> FunctionSpec {
        let mut spec = FunctionSpec::new("fn-basic", RuntimeKind::Python311);
        spec.code = Some(CodeSource::Inline("def handle(req):\n    return 'ok'\n".into()));
        spec.config = Some(FunctionConfig {
            memory_mb: 128,
            timeout_seconds: 30,
            replicas: 1,
            hardware_type: HardwareType::Cpu,
        });
        spec
    }

    fn create_basic(engine: &FunctionEngine) -> FunctionState {
        engine
            .create(&basic_spec(), &Cancellation::new(), |_| Ok(()))
            .unwrap()
    }

    #[test]
    fn test_create_basic_function() {
        let mock = MockBackend::new();
        let engine = engine(&mock);

        let state = create_basic(&engine);
        assert_eq!(state.status, FunctionStatus::Running);
        assert!(!state.invoke_url.is_empty());

        let config = state.config.unwrap();
        assert_eq!(config.memory_mb, 128);
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.replicas, 1);
        assert_eq!(config.hardware_type, "cpu");
        assert_eq!(mock.count(Verb::CreateFunction), 1);
    }

    #[test]
    fn test_create_then_read_round_trips_settable_fields() {
        let mock = MockBackend::new();
        let engine = engine(&mock);

        let mut spec = basic_spec();
        spec.template = crate::function::Template::FastApi;
        spec.handler = "main".into();
        spec.environment.insert("LOG_LEVEL".into(), "debug".into());
        spec.secrets = vec!["db-password".into(), "api-token".into()];
        spec.labels.insert("team".into(), "platform".into());
        spec.annotations.insert("owner".into(), "ops".into());

        let created = engine.create(&spec, &Cancellation::new(), |_| Ok(())).unwrap();
        let read = engine.read(&created.id).unwrap().unwrap();

        let mut expected = spec.clone();
        expected.code = None;
        assert_eq!(spec_from_state(&read).unwrap(), expected);
    }

    #[test]
    fn test_create_hands_identity_over_before_waiting() {
        let mock = MockBackend::new();
        mock.set_rollout(["Deploying", "Running"]);
        let engine = engine(&mock);

        let recorded = RefCell::new(None);
        let state = engine
            .create(&basic_spec(), &Cancellation::new(), |created| {
                assert_eq!(created.status, FunctionStatus::Deploying);
                assert_eq!(mock.count(Verb::GetFunction), 0);
                *recorded.borrow_mut() = Some(created.id.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(recorded.into_inner(), Some(state.id));
    }

    #[test]
    fn test_create_keeps_identity_when_rollout_times_out() {
        let mock = MockBackend::new();
        mock.set_rollout(["Deploying"]);
        let engine = engine(&mock);

        let recorded = RefCell::new(None);
        let err = engine
            .create(&basic_spec(), &Cancellation::new(), |created| {
                *recorded.borrow_mut() = Some(created.id.clone());
                Ok(())
            })
            .unwrap_err();

        match err {
            ProviderError::Timeout { last_status, target, .. } => {
                assert_eq!(last_status, "Deploying");
                assert_eq!(target, "Running");
            }
            other => panic!("expected timeout, got {other}"),
        }
        let id = recorded.into_inner().unwrap();
        assert!(mock.function(&id).is_some());
    }

    #[test]
    fn test_create_keeps_identity_when_rollout_fails() {
        let mock = MockBackend::new();
        mock.set_rollout(["Deploying", "Failed"]);
        mock.set_failure_message("image build failed: missing handler");
        let engine = engine(&mock);

        let recorded = RefCell::new(None);
        let err = engine
            .create(&basic_spec(), &Cancellation::new(), |created| {
                *recorded.borrow_mut() = Some(created.id.clone());
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(
            &err,
            ProviderError::DeploymentFailed { message, .. } if message == "image build failed: missing handler"
        ));
        assert!(recorded.into_inner().is_some());
        // Deploying, Failed; no read afterwards.
        assert_eq!(mock.count(Verb::GetFunction), 2);
    }

    #[test]
    fn test_create_stops_when_identity_sink_fails() {
        let mock = MockBackend::new();
        let engine = engine(&mock);

        let err = engine
            .create(&basic_spec(), &Cancellation::new(), |_| {
                Err(ProviderError::State("disk full".into()))
            })
            .unwrap_err();
        assert!(matches!(err, ProviderError::State(_)));
        assert_eq!(mock.count(Verb::GetFunction), 0);
    }

    #[test]
    fn test_two_code_sources_fail_before_any_call() {
        let mock = MockBackend::new();
        let manifest: Manifest = toml::from_str(
            r#"
[[function]]
name = "fn-basic"
runtime = "python3.11"
code_inline = "x"
code_path = "./src"
"#,
        )
        .unwrap();

        assert!(manifest.into_desired(Path::new("."), |_| None).is_err());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_missing_archive_fails_before_any_call() {
        let mock = MockBackend::new();
        let engine = engine(&mock);

        let mut spec = basic_spec();
        spec.code = Some(CodeSource::Archive("/nonexistent/fn.zip".into()));
        let err = engine.create(&spec, &Cancellation::new(), |_| Ok(())).unwrap_err();

        assert!(matches!(err, ProviderError::Io { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_directory_code_is_zipped_and_encoded() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("handler.py"), "def handle(req): pass").unwrap();

        let mock = MockBackend::new();
        let engine = engine(&mock);
        let mut spec = basic_spec();
        spec.code = Some(CodeSource::Directory(temp.path().to_path_buf()));
        engine.create(&spec, &Cancellation::new(), |_| Ok(())).unwrap();

        let creates = mock.calls_for(Verb::CreateFunction);
        let Call::CreateFunction(request) = &creates[0] else {
            panic!("expected create call");
        };
        assert!(request.code_inline.is_none());
        let bytes = STANDARD.decode(request.code_archive.as_ref().unwrap()).unwrap();
        assert_eq!(bytes, zip_directory(temp.path()).unwrap());
    }

    #[test]
    fn test_read_absent_is_not_an_error() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        assert!(engine.read("fn-missing").unwrap().is_none());
    }

    #[test]
    fn test_read_other_errors_propagate() {
        let mock = MockBackend::new();
        mock.fail_next(Verb::GetFunction, faaskit::Error::http("get function", 500, "oops"));
        let engine = engine(&mock);

        let err = engine.read("fn-0001").unwrap_err();
        assert!(err.to_string().contains("status=500"));
    }

    #[test]
    fn test_update_without_changes_only_reads() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let state = create_basic(&engine);
        mock.clear_calls();

        let spec = basic_spec();
        let updated = engine
            .update(&state.id, &spec, &spec.clone(), &Cancellation::new())
            .unwrap();

        assert_eq!(updated.id, state.id);
        assert!(mock.calls().iter().all(|c| !c.is_update()));
        assert_eq!(mock.calls(), vec![Call::GetFunction(state.id.clone())]);
    }

    #[test]
    fn test_update_environment_only() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let state = create_basic(&engine);
        mock.clear_calls();

        let previous = basic_spec();
        let mut next = previous.clone();
        next.environment.insert("MODE".into(), "prod".into());
        next.secrets.push("db-password".into());

        let updated = engine
            .update(&state.id, &previous, &next, &Cancellation::new())
            .unwrap();

        let updates: Vec<Call> = mock.calls().into_iter().filter(Call::is_update).collect();
        assert_eq!(updates.len(), 1);
        let Call::UpdateEnvironment { request, .. } = &updates[0] else {
            panic!("expected environment update, got {:?}", updates[0]);
        };
        assert_eq!(request.environment["MODE"], "prod");
        assert_eq!(request.secrets, vec!["db-password"]);
        assert_eq!(updated.environment["MODE"], "prod");
    }

    #[test]
    fn test_update_memory_only() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let state = create_basic(&engine);
        mock.clear_calls();

        let previous = basic_spec();
        let mut next = previous.clone();
        if let Some(config) = next.config.as_mut() {
            config.memory_mb = 256;
        }

        let updated = engine
            .update(&state.id, &previous, &next, &Cancellation::new())
            .unwrap();

        let configs = mock.calls_for(Verb::UpdateConfig);
        assert_eq!(configs.len(), 1);
        let Call::UpdateConfig { request, .. } = &configs[0] else {
            unreachable!();
        };
        assert_eq!(
            (request.memory_mb, request.timeout_seconds, request.replicas),
            (256, 30, 1)
        );
        assert_eq!(mock.count(Verb::UpdateEnvironment), 0);
        assert_eq!(mock.count(Verb::UpdateMetadata), 0);
        assert_eq!(mock.count(Verb::UpdateCode), 0);
        assert_eq!(updated.config.unwrap().memory_mb, 256);
    }

    #[test]
    fn test_update_removed_config_block_sends_defaults() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let mut previous = basic_spec();
        previous.config = Some(FunctionConfig {
            memory_mb: 1024,
            timeout_seconds: 120,
            replicas: 3,
            hardware_type: HardwareType::Cpu,
        });
        let state = engine
            .create(&previous, &Cancellation::new(), |_| Ok(()))
            .unwrap();
        mock.clear_calls();

        let mut next = previous.clone();
        next.config = None;
        let updated = engine
            .update(&state.id, &previous, &next, &Cancellation::new())
            .unwrap();

        let configs = mock.calls_for(Verb::UpdateConfig);
        assert_eq!(configs.len(), 1);
        let Call::UpdateConfig { request, .. } = &configs[0] else {
            unreachable!();
        };
        assert_eq!(
            (request.memory_mb, request.timeout_seconds, request.replicas),
            (128, 30, 1)
        );
        assert_eq!(mock.calls().iter().filter(|c| c.is_update()).count(), 1);
        assert_eq!(updated.config.unwrap().memory_mb, 128);
    }

    #[test]
    fn test_update_groups_in_fixed_order() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let state = create_basic(&engine);
        mock.clear_calls();

        let previous = basic_spec();
        let mut next = previous.clone();
        next.labels.insert("tier".into(), "gold".into());
        next.environment.insert("A".into(), "1".into());
        next.code = Some(CodeSource::Inline("def handle(req): return 'v2'".into()));
        next.config = Some(FunctionConfig {
            replicas: 3,
            ..FunctionConfig::default()
        });

        engine
            .update(&state.id, &previous, &next, &Cancellation::new())
            .unwrap();

        let verbs: Vec<Verb> = mock
            .calls()
            .iter()
            .filter(|c| c.is_update())
            .map(Call::verb)
            .collect();
        assert_eq!(
            verbs,
            vec![
                Verb::UpdateCode,
                Verb::UpdateConfig,
                Verb::UpdateEnvironment,
                Verb::UpdateMetadata
            ]
        );
    }

    #[test]
    fn test_update_partial_failure_keeps_earlier_groups() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let state = create_basic(&engine);

        let previous = basic_spec();
        let mut next = previous.clone();
        next.handler = "main".into();
        next.labels.insert("tier".into(), "gold".into());
        mock.fail_next(
            Verb::UpdateMetadata,
            faaskit::Error::http("update function metadata", 422, "bad label"),
        );

        let err = engine
            .update(&state.id, &previous, &next, &Cancellation::new())
            .unwrap_err();
        assert!(err.to_string().contains("bad label"));
        assert_eq!(mock.function(&state.id).unwrap().handler_function, "main");
    }

    #[test]
    fn test_update_rejects_forced_replacement() {
        let mock = MockBackend::new();
        let engine = engine(&mock);

        let previous = basic_spec();
        let mut next = previous.clone();
        next.runtime = RuntimeKind::Node20;
        let err = engine
            .update("fn-0001", &previous, &next, &Cancellation::new())
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_update_of_vanished_function_is_not_found() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let state = create_basic(&engine);
        mock.remove_function(&state.id);

        let spec = basic_spec();
        let err = engine
            .update(&state.id, &spec, &spec.clone(), &Cancellation::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_polling_converges_after_three_fetches() {
        let mock = MockBackend::new();
        mock.set_rollout(["Deploying", "Deploying", "Running"]);
        let engine = engine(&mock);
        let created = mock
            .create_function(&FunctionCreateRequest {
                name: "fn-poll".into(),
                runtime: "node20".into(),
                ..Default::default()
            })
            .unwrap();
        mock.clear_calls();

        engine
            .wait_running(&created.id, Duration::from_secs(5), &Cancellation::new())
            .unwrap();
        assert_eq!(mock.count(Verb::GetFunction), 3);
    }

    #[test]
    fn test_polling_failed_without_message_uses_default() {
        let mock = MockBackend::new();
        mock.set_rollout(["Failed", "Running"]);
        let engine = engine(&mock);
        let created = mock
            .create_function(&FunctionCreateRequest {
                name: "fn-poll".into(),
                runtime: "node20".into(),
                ..Default::default()
            })
            .unwrap();
        mock.clear_calls();

        let err = engine
            .wait_running(&created.id, Duration::from_secs(5), &Cancellation::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("function {} deployment failed: deployment failed", created.id)
        );
        assert_eq!(mock.count(Verb::GetFunction), 1);
    }

    #[test]
    fn test_polling_cancelled_from_another_thread() {
        let mock = MockBackend::new();
        mock.set_rollout(["Deploying"]);
        let client = Arc::new(Client::with_backend(Box::new(mock.clone())));
        let engine = FunctionEngine::new(
            client,
            Timeouts::default(),
            WaitPolicy::fixed(Duration::ZERO, Duration::from_secs(30)),
        );
        let created = mock
            .create_function(&FunctionCreateRequest {
                name: "fn-slow".into(),
                runtime: "node20".into(),
                ..Default::default()
            })
            .unwrap();

        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.cancel();
        });

        let err = engine
            .wait_running(&created.id, Duration::from_secs(60), &cancel)
            .unwrap_err();
        handle.join().unwrap();
        assert!(matches!(err, ProviderError::Cancelled { .. }));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let state = create_basic(&engine);

        engine.delete(&state.id, &Cancellation::new()).unwrap();
        engine.delete(&state.id, &Cancellation::new()).unwrap();
        assert_eq!(mock.count(Verb::DeleteFunction), 2);
        assert!(mock.function(&state.id).is_none());
    }

    #[test]
    fn test_delete_polls_until_gone() {
        let mock = MockBackend::new();
        mock.set_delete_lag(2);
        let engine = engine(&mock);
        let state = create_basic(&engine);
        mock.clear_calls();

        engine.delete(&state.id, &Cancellation::new()).unwrap();
        assert_eq!(mock.count(Verb::GetFunction), 3);
    }

    #[test]
    fn test_delete_aborts_on_polling_error() {
        let mock = MockBackend::new();
        mock.set_delete_lag(5);
        let engine = engine(&mock);
        let state = create_basic(&engine);
        mock.clear_calls();
        mock.fail_next(Verb::GetFunction, faaskit::Error::Network("reset".into()));

        let err = engine.delete(&state.id, &Cancellation::new()).unwrap_err();
        assert!(matches!(err, ProviderError::Transport { .. }));
        assert_eq!(mock.count(Verb::GetFunction), 1);
    }

    #[test]
    fn test_delete_times_out_while_still_visible() {
        let mock = MockBackend::new();
        mock.set_delete_lag(usize::MAX);
        let engine = engine(&mock);
        let state = create_basic(&engine);

        let err = engine.delete(&state.id, &Cancellation::new()).unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { target: "deleted", .. }));
    }

    #[test]
    fn test_delete_call_failure_is_reported() {
        let mock = MockBackend::new();
        mock.fail_next(
            Verb::DeleteFunction,
            faaskit::Error::http("delete function", 403, "forbidden"),
        );
        let engine = engine(&mock);

        let err = engine.delete("fn-0001", &Cancellation::new()).unwrap_err();
        assert!(err.to_string().contains("forbidden"));
        assert_eq!(mock.count(Verb::GetFunction), 0);
    }

    #[test]
    fn test_find_by_name() {
        let mock = MockBackend::new();
        let engine = engine(&mock);
        let state = create_basic(&engine);

        assert_eq!(engine.find_by_name("fn-basic").unwrap().unwrap().id, state.id);
        assert!(engine.find_by_name("fn-other").unwrap().is_none());
    }
}
