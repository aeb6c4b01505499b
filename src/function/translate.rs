//! Conversions between typed function state and API wire types.
//!
//! Everything here is pure: code payloads are resolved by the engine before
//! a request is built.

use super::{DEFAULT_HANDLER, FunctionConfig, FunctionSpec, FunctionState, HardwareType, Template};
use crate::error::ProviderError;
use faaskit::{
    FunctionCodeUpdateRequest, FunctionConfigUpdateRequest, FunctionCreateRequest,
    FunctionEnvUpdateRequest, FunctionMetadataUpdateRequest, FunctionResponse,
};

/// Code as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodePayload {
    /// Raw source text.
    Inline(String),
    /// Base64 of a zip archive.
    Archive(String),
}

impl CodePayload {
    fn split(payload: Option<&Self>) -> (Option<String>, Option<String>) {
        match payload {
            Some(Self::Inline(code)) => (Some(code.clone()), None),
            Some(Self::Archive(encoded)) => (None, Some(encoded.clone())),
            None => (None, None),
        }
    }
}

fn wire_config(config: &FunctionConfig) -> faaskit::FunctionConfig {
    faaskit::FunctionConfig {
        memory_mb: config.memory_mb,
        timeout_seconds: config.timeout_seconds,
        replicas: config.replicas,
        hardware_type: config.hardware_type.as_str().to_string(),
    }
}

/// Body of the creation request.
pub fn create_request(spec: &FunctionSpec, code: Option<&CodePayload>) -> FunctionCreateRequest {
    let (code_inline, code_archive) = CodePayload::split(code);
    FunctionCreateRequest {
        name: spec.name.clone(),
        runtime: spec.runtime.as_str().to_string(),
        template: spec.template.as_str().to_string(),
        handler_function: spec.handler.clone(),
        code_inline,
        code_archive,
        requirements: spec.requirements.clone(),
        config: spec.config.as_ref().map(wire_config),
        environment: spec.environment.clone(),
        secrets: spec.secrets.clone(),
        labels: spec.labels.clone(),
        annotations: spec.annotations.clone(),
    }
}

/// Body of the code update.
pub fn code_update_request(
    spec: &FunctionSpec,
    code: Option<&CodePayload>,
) -> FunctionCodeUpdateRequest {
    let (code_inline, code_archive) = CodePayload::split(code);
    FunctionCodeUpdateRequest {
        code_inline,
        code_archive,
        requirements: spec.requirements.clone(),
        handler_function: spec.handler.clone(),
    }
}

/// Body of the config update. Hardware type is not part of it.
pub fn config_update_request(config: &FunctionConfig) -> FunctionConfigUpdateRequest {
    FunctionConfigUpdateRequest {
        memory_mb: config.memory_mb,
        timeout_seconds: config.timeout_seconds,
        replicas: config.replicas,
    }
}

/// Body of the environment update: environment and secrets together.
pub fn environment_update_request(spec: &FunctionSpec) -> FunctionEnvUpdateRequest {
    FunctionEnvUpdateRequest {
        environment: spec.environment.clone(),
        secrets: spec.secrets.clone(),
    }
}

/// Body of the metadata update: labels and annotations together.
pub fn metadata_update_request(spec: &FunctionSpec) -> FunctionMetadataUpdateRequest {
    FunctionMetadataUpdateRequest {
        labels: spec.labels.clone(),
        annotations: spec.annotations.clone(),
    }
}

/// Flatten an API response into observed state.
///
/// Null collections become empty; the config block stays absent if the
/// server sent none.
pub fn flatten(response: FunctionResponse) -> FunctionState {
    FunctionState {
        id: response.id,
        name: response.name,
        namespace: response.namespace,
        runtime: response.runtime,
        template: response.template,
        handler: response.handler_function,
        invoke_url: response.invoke_url,
        status: response.status,
        version: response.version,
        error_message: response.error_message.filter(|m| !m.is_empty()),
        created_at: response.created_at,
        updated_at: response.updated_at,
        invocation_count: response.invocation_count,
        config: response.config,
        environment: response.environment.unwrap_or_default(),
        secrets: response.secrets.unwrap_or_default(),
        labels: response.labels.unwrap_or_default(),
        annotations: response.annotations.unwrap_or_default(),
    }
}

/// Derive a desired state from observed state, for import.
///
/// The code source cannot be recovered and is left unset.
pub fn spec_from_state(state: &FunctionState) -> Result<FunctionSpec, ProviderError> {
    let invalid = |e: String| ProviderError::Validation(format!("function {}: {e}", state.name));

    let runtime = state.runtime.parse().map_err(invalid)?;
    let template = if state.template.is_empty() {
        Template::default()
    } else {
        state.template.parse().map_err(invalid)?
    };
    let config = match &state.config {
        Some(c) => Some(FunctionConfig {
            memory_mb: c.memory_mb,
            timeout_seconds: c.timeout_seconds,
            replicas: c.replicas,
            hardware_type: if c.hardware_type.is_empty() {
                HardwareType::default()
            } else {
                c.hardware_type.parse().map_err(invalid)?
            },
        }),
        None => None,
    };

    Ok(FunctionSpec {
        name: state.name.clone(),
        runtime,
        template,
        code: None,
        handler: if state.handler.is_empty() {
            DEFAULT_HANDLER.to_string()
        } else {
            state.handler.clone()
        },
        requirements: None,
        config,
        environment: state.environment.clone(),
        secrets: state.secrets.clone(),
        labels: state.labels.clone(),
        annotations: state.annotations.clone(),
    })
}
