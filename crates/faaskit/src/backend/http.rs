//! HTTP backend for the FaaS control-plane API.
//!
//! This module provides the [`HttpBackend`] implementation, a thin blocking
//! client over `ureq`. Every request carries the bearer token and a
//! `User-Agent`; reads and deletes additionally carry the `apikey` query
//! parameter.
//!
//! Status codes are checked by hand (the agent is configured not to turn
//! them into errors) so the response body can be attached to the error.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    FunctionCodeUpdateRequest, FunctionConfigUpdateRequest, FunctionCreateRequest,
    FunctionEnvUpdateRequest, FunctionList, FunctionMetadataUpdateRequest, FunctionResponse,
    RuntimeCatalog, SecretCreateRequest, SecretResponse,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Body, RequestBuilder};

/// API path below the configured endpoint.
const FAAS_API_PATH: &str = "faas/api/v1/";

/// Default endpoint of the public control plane.
pub const DEFAULT_ENDPOINT: &str = "https://api.e2enetworks.com/myaccount/api/v1/";

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Base URL of the API, e.g. `https://api.example.com/v1/`.
    pub endpoint: String,
    /// Bearer token sent in the `Authorization` header.
    pub auth_token: String,
    /// API key sent as the `apikey` query parameter.
    pub api_key: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Timeout for a single request, from connect to end of body.
    pub request_timeout: Duration,
}

impl HttpSettings {
    /// Settings for the default endpoint with the given credentials.
    pub fn new(auth_token: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            auth_token: auth_token.into(),
            api_key: api_key.into(),
            user_agent: concat!("faasform/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Use a different endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Blocking HTTP backend.
///
/// The underlying `ureq::Agent` is cheap to clone and safe to share, so one
/// backend can serve concurrent reconciliations.
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Full API base URL, always ending in `/`.
    base_url: String,
    settings: HttpSettings,
}

impl HttpBackend {
    /// Create a new HTTP backend.
    #[must_use]
    pub fn new(settings: HttpSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(settings.request_timeout))
            .build();
        let agent = ureq::Agent::new_with_config(config);

        let mut endpoint = settings.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        Self {
            agent,
            base_url: format!("{endpoint}{FAAS_API_PATH}"),
            settings,
        }
    }

    /// Get the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        request
            .header(
                "Authorization",
                format!("Bearer {}", self.settings.auth_token).as_str(),
            )
            .header("User-Agent", self.settings.user_agent.as_str())
    }

    fn with_api_key<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        self.authorized(request)
            .query("apikey", self.settings.api_key.as_str())
    }
}

/// Read the body and decode it if the status is one of `accepted`.
fn decode<T: DeserializeOwned>(
    operation: &'static str,
    mut response: Response<Body>,
    accepted: &[u16],
) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string()?;
    if !accepted.contains(&status) {
        return Err(Error::http(operation, status, body));
    }
    Ok(serde_json::from_str(&body)?)
}

/// Check the status of a response without a body of interest.
///
/// A 404 counts as success: the entity is already gone.
fn expect_deleted(operation: &'static str, mut response: Response<Body>) -> Result<()> {
    let status = response.status().as_u16();
    match status {
        200 | 204 => Ok(()),
        404 => {
            log::debug!("{operation}: already deleted");
            Ok(())
        }
        _ => {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            Err(Error::http(operation, status, body))
        }
    }
}

impl Backend for HttpBackend {
    fn create_function(&self, req: &FunctionCreateRequest) -> Result<FunctionResponse> {
        let url = self.url("functions");
        log::debug!("POST {url} (function {})", req.name);
        let response = self.authorized(self.agent.post(&url)).send_json(req)?;
        decode("create function", response, &[200, 201])
    }

    fn get_function(&self, id: &str) -> Result<FunctionResponse> {
        let url = self.url(&format!("functions/{id}"));
        log::trace!("GET {url}");
        let response = self.with_api_key(self.agent.get(&url)).call()?;
        if response.status().as_u16() == 404 {
            return Err(Error::function_not_found(id));
        }
        decode("get function", response, &[200])
    }

    fn list_functions(&self) -> Result<FunctionList> {
        let url = self.url("functions");
        log::debug!("GET {url}");
        let response = self.with_api_key(self.agent.get(&url)).call()?;
        decode("list functions", response, &[200])
    }

    fn update_function_code(
        &self,
        id: &str,
        req: &FunctionCodeUpdateRequest,
    ) -> Result<FunctionResponse> {
        let url = self.url(&format!("functions/{id}/code"));
        log::debug!("PUT {url}");
        let response = self.authorized(self.agent.put(&url)).send_json(req)?;
        decode("update function code", response, &[200])
    }

    fn update_function_config(
        &self,
        id: &str,
        req: &FunctionConfigUpdateRequest,
    ) -> Result<FunctionResponse> {
        let url = self.url(&format!("functions/{id}/config"));
        log::debug!("PUT {url}");
        let response = self.authorized(self.agent.put(&url)).send_json(req)?;
        decode("update function config", response, &[200])
    }

    fn update_function_environment(
        &self,
        id: &str,
        req: &FunctionEnvUpdateRequest,
    ) -> Result<FunctionResponse> {
        let url = self.url(&format!("functions/{id}/environment"));
        log::debug!("PUT {url}");
        let response = self.authorized(self.agent.put(&url)).send_json(req)?;
        decode("update function environment", response, &[200])
    }

    fn update_function_metadata(
        &self,
        id: &str,
        req: &FunctionMetadataUpdateRequest,
    ) -> Result<FunctionResponse> {
        let url = self.url(&format!("functions/{id}/metadata"));
        log::debug!("PUT {url}");
        let response = self.authorized(self.agent.put(&url)).send_json(req)?;
        decode("update function metadata", response, &[200])
    }

    fn delete_function(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("functions/{id}"));
        log::debug!("DELETE {url}");
        let response = self.with_api_key(self.agent.delete(&url)).call()?;
        expect_deleted("delete function", response)
    }

    fn create_secret(&self, req: &SecretCreateRequest) -> Result<SecretResponse> {
        let url = self.url("secrets");
        log::debug!("POST {url} (secret {})", req.name);
        let response = self.authorized(self.agent.post(&url)).send_json(req)?;
        decode("create secret", response, &[200, 201])
    }

    fn delete_secret(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("secrets/{name}"));
        log::debug!("DELETE {url}");
        let response = self.with_api_key(self.agent.delete(&url)).call()?;
        expect_deleted("delete secret", response)
    }

    fn list_runtimes(&self) -> Result<RuntimeCatalog> {
        let url = self.url("runtimes");
        log::debug!("GET {url}");
        let response = self.with_api_key(self.agent.get(&url)).call()?;
        decode("list runtimes", response, &[200])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_appends_api_path() {
        let backend = HttpBackend::new(
            HttpSettings::new("token", "key").endpoint("https://custom.api.com/v1"),
        );
        assert_eq!(backend.base_url(), "https://custom.api.com/v1/faas/api/v1/");
    }

    #[test]
    fn test_default_endpoint() {
        let backend = HttpBackend::new(HttpSettings::new("token", "key"));
        assert!(backend.base_url().starts_with(DEFAULT_ENDPOINT));
        assert!(backend.base_url().ends_with("faas/api/v1/"));
    }

    #[test]
    fn test_function_urls() {
        let backend = HttpBackend::new(
            HttpSettings::new("token", "key").endpoint("https://custom.api.com/"),
        );
        assert_eq!(
            backend.url("functions/fn-1/config"),
            "https://custom.api.com/faas/api/v1/functions/fn-1/config"
        );
        assert_eq!(
            backend.url("secrets/db"),
            "https://custom.api.com/faas/api/v1/secrets/db"
        );
    }

    #[test]
    fn test_settings_user_agent() {
        let settings = HttpSettings::new("token", "key");
        assert!(settings.user_agent.starts_with("faasform/"));
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
    }
}
