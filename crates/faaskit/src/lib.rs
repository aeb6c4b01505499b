//! # faaskit
//!
//! Blocking client for a Function-as-a-Service control plane.
//!
//! This crate provides:
//! - Typed request/response bodies for functions, secrets and runtimes
//! - A [`Backend`](backend::Backend) trait with one method per API verb
//! - An HTTP implementation over `ureq` and an in-memory mock for tests
//! - Errors that single out "not found" as a recoverable outcome
//!
//! ## Example
//!
//! ```no_run
//! use faaskit::{Client, HttpSettings};
//!
//! let client = Client::new(HttpSettings::new("token", "api-key"));
//!
//! for runtime in client.runtimes(Some("gpu")).expect("listing failed") {
//!     println!("{} {}", runtime.name, runtime.version);
//! }
//!
//! match client.get_function("fn-0001") {
//!     Ok(function) => println!("{} is {}", function.name, function.status),
//!     Err(e) if e.is_not_found() => println!("gone"),
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
#[allow(missing_docs)]
pub mod types;

pub use backend::http::{DEFAULT_ENDPOINT, HttpBackend, HttpSettings};
pub use backend::{Backend, Call, MockBackend, Verb};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    FunctionCodeUpdateRequest, FunctionConfig, FunctionConfigUpdateRequest,
    FunctionCreateRequest, FunctionEnvUpdateRequest, FunctionList,
    FunctionMetadataUpdateRequest, FunctionResponse, FunctionStatus, Runtime, RuntimeCatalog,
    SecretCreateRequest, SecretResponse,
};

/// High-level client for control-plane operations.
///
/// The client forwards every verb to its backend and adds a few
/// conveniences on top (runtime filtering, lookup by name).
///
/// # Example
///
/// ```
/// use faaskit::{Client, MockBackend};
///
/// let client = Client::with_backend(Box::new(MockBackend::with_runtimes()));
/// let gpu = client.runtimes(Some("gpu")).unwrap();
/// assert!(gpu.iter().all(|r| r.supports_hardware("gpu")));
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a new Client talking HTTP to the configured endpoint.
    #[must_use]
    pub fn new(settings: HttpSettings) -> Self {
        Self {
            backend: Box::new(HttpBackend::new(settings)),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Create a function.
    pub fn create_function(&self, req: &FunctionCreateRequest) -> Result<FunctionResponse> {
        self.backend.create_function(req)
    }

    /// Get a function by id. Fails with a not-found error if it is gone.
    pub fn get_function(&self, id: &str) -> Result<FunctionResponse> {
        self.backend.get_function(id)
    }

    /// List all functions.
    pub fn list_functions(&self) -> Result<FunctionList> {
        self.backend.list_functions()
    }

    /// Find a function by its name.
    pub fn find_function(&self, name: &str) -> Result<Option<FunctionResponse>> {
        let list = self.backend.list_functions()?;
        Ok(list.functions.into_iter().find(|f| f.name == name))
    }

    /// Update code, handler and requirements.
    pub fn update_function_code(
        &self,
        id: &str,
        req: &FunctionCodeUpdateRequest,
    ) -> Result<FunctionResponse> {
        self.backend.update_function_code(id, req)
    }

    /// Update memory, timeout and replicas.
    pub fn update_function_config(
        &self,
        id: &str,
        req: &FunctionConfigUpdateRequest,
    ) -> Result<FunctionResponse> {
        self.backend.update_function_config(id, req)
    }

    /// Update environment variables and secret bindings.
    pub fn update_function_environment(
        &self,
        id: &str,
        req: &FunctionEnvUpdateRequest,
    ) -> Result<FunctionResponse> {
        self.backend.update_function_environment(id, req)
    }

    /// Update labels and annotations.
    pub fn update_function_metadata(
        &self,
        id: &str,
        req: &FunctionMetadataUpdateRequest,
    ) -> Result<FunctionResponse> {
        self.backend.update_function_metadata(id, req)
    }

    /// Delete a function. Succeeds if it is already gone.
    pub fn delete_function(&self, id: &str) -> Result<()> {
        self.backend.delete_function(id)
    }

    // =========================================================================
    // Secrets
    // =========================================================================

    /// Create a secret.
    pub fn create_secret(&self, req: &SecretCreateRequest) -> Result<SecretResponse> {
        self.backend.create_secret(req)
    }

    /// Delete a secret by name. Succeeds if it is already gone.
    pub fn delete_secret(&self, name: &str) -> Result<()> {
        self.backend.delete_secret(name)
    }

    // =========================================================================
    // Runtimes
    // =========================================================================

    /// List runtimes, optionally only those supporting a hardware type.
    ///
    /// Catalog order is preserved.
    pub fn runtimes(&self, hardware: Option<&str>) -> Result<Vec<Runtime>> {
        let catalog = self.backend.list_runtimes()?;
        Ok(catalog
            .runtimes
            .into_iter()
            .filter(|r| hardware.is_none_or(|hw| r.supports_hardware(hw)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_mock_backend() {
        let mock = MockBackend::with_runtimes();
        let client = Client::with_backend(Box::new(mock.clone()));

        let all = client.runtimes(None).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(mock.count(Verb::ListRuntimes), 1);
    }

    #[test]
    fn test_runtimes_filter_by_hardware() {
        let client = Client::with_backend(Box::new(MockBackend::with_runtimes()));

        let gpu: Vec<String> = client
            .runtimes(Some("gpu"))
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(gpu, vec!["pytorch2.1.2", "tensorflow2.19.0"]);

        let tpu = client.runtimes(Some("tpu")).unwrap();
        assert!(tpu.is_empty());
    }

    #[test]
    fn test_find_function_by_name() {
        let mock = MockBackend::new();
        let client = Client::with_backend(Box::new(mock.clone()));

        let created = client
            .create_function(&FunctionCreateRequest {
                name: "fn-lookup".to_string(),
                runtime: "node20".to_string(),
                ..Default::default()
            })
            .unwrap();

        let found = client.find_function("fn-lookup").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(client.find_function("fn-missing").unwrap().is_none());
    }

    #[test]
    fn test_client_propagates_not_found() {
        let client = Client::with_backend(Box::new(MockBackend::new()));
        assert!(client.get_function("missing").unwrap_err().is_not_found());
        assert!(client.delete_function("missing").is_ok());
    }
}
