//! Manifest schema: the TOML file users write, and its validation into typed
//! desired state.
//!
//! ```toml
//! [provider]
//! endpoint = "https://api.example.com/v1/"
//!
//! [[secret]]
//! name = "db-password"
//! value_env = "DB_PASSWORD"
//!
//! [[function]]
//! name = "fn-basic"
//! runtime = "python3.11"
//! code_path = "./src"
//! secrets = ["db-password"]
//!
//! [function.config]
//! memory_mb = 256
//! ```
//!
//! Raw structs mirror the file one-to-one. [`Manifest::into_desired`] checks
//! every constraint before anything talks to the network.

use crate::config::{ProviderSection, expand_path};
use crate::function::{
    CodeSource, DEFAULT_HANDLER, FunctionConfig, FunctionSpec, MEMORY_MB_RANGE, NAME_MAX_LEN,
    NAME_MIN_LEN, REPLICAS_RANGE, TIMEOUT_SECONDS_RANGE,
};
use crate::secret::SecretSpec;
use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").ok());

// ============================================================================
// Raw Schema
// ============================================================================

/// Top level of `faasform.toml`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub provider: ProviderSection,

    #[serde(default, rename = "function")]
    pub functions: Vec<RawFunction>,

    #[serde(default, rename = "secret")]
    pub secrets: Vec<RawSecret>,
}

/// A `[[function]]` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFunction {
    pub name: String,
    pub runtime: String,
    pub template: Option<String>,
    pub handler: Option<String>,

    /// Source text
    pub code_inline: Option<String>,
    /// Path of a prebuilt zip archive
    pub code_archive: Option<String>,
    /// Directory zipped at upload time
    pub code_path: Option<String>,

    pub requirements: Option<String>,
    pub config: Option<RawConfig>,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// A `[function.config]` table. Missing fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub memory_mb: Option<u32>,
    pub timeout_seconds: Option<u32>,
    pub replicas: Option<u32>,
    pub hardware_type: Option<String>,
}

/// A `[[secret]]` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSecret {
    pub name: String,
    /// Literal value
    pub value: Option<String>,
    /// Name of an environment variable holding the value
    pub value_env: Option<String>,
    pub namespace: Option<String>,
}

// ============================================================================
// Typed Desired State
// ============================================================================

/// Validated contents of a manifest
#[derive(Debug, Clone, Default)]
pub struct Desired {
    pub provider: ProviderSection,
    pub functions: Vec<FunctionSpec>,
    pub secrets: Vec<SecretSpec>,
}

impl Manifest {
    /// Load and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Validate into desired state.
    ///
    /// Relative code paths are resolved against `base_dir`, the directory
    /// holding the manifest. Secret values from `value_env` are read with
    /// `lookup`.
    pub fn into_desired(
        self,
        base_dir: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Desired> {
        let mut seen = BTreeSet::new();
        let mut functions = Vec::with_capacity(self.functions.len());
        for raw in self.functions {
            if !seen.insert(raw.name.clone()) {
                bail!("Duplicate function name '{}'", raw.name);
            }
            let name = raw.name.clone();
            let spec = convert_function(raw, base_dir)
                .with_context(|| format!("Invalid function '{name}'"))?;
            functions.push(spec);
        }

        let mut seen = BTreeSet::new();
        let mut secrets = Vec::with_capacity(self.secrets.len());
        for raw in self.secrets {
            if !seen.insert(raw.name.clone()) {
                bail!("Duplicate secret name '{}'", raw.name);
            }
            let name = raw.name.clone();
            let spec =
                convert_secret(raw, &lookup).with_context(|| format!("Invalid secret '{name}'"))?;
            secrets.push(spec);
        }

        Ok(Desired {
            provider: self.provider,
            functions,
            secrets,
        })
    }
}

/// Load a manifest and validate it, reading secret values from the process environment
pub fn load_desired(path: &Path) -> Result<Desired> {
    let manifest = Manifest::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    manifest.into_desired(base_dir, |var| std::env::var(var).ok())
}

// ============================================================================
// Conversion
// ============================================================================

/// Check the naming rule shared by functions and secrets
pub fn validate_name(name: &str) -> Result<()> {
    let len = name.len();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        bail!("name '{name}' must be {NAME_MIN_LEN}-{NAME_MAX_LEN} characters long (got {len})");
    }
    if !NAME_PATTERN.as_ref().is_some_and(|re| re.is_match(name)) {
        bail!(
            "name '{name}' must contain only lowercase letters, digits and hyphens, \
             and start and end with a letter or digit"
        );
    }
    Ok(())
}

fn check_range(field: &str, value: u32, (min, max): (u32, u32)) -> Result<u32> {
    if !(min..=max).contains(&value) {
        bail!("config.{field} must be between {min} and {max} (got {value})");
    }
    Ok(value)
}

fn resolve_path(base_dir: &Path, raw: &str) -> PathBuf {
    let path = expand_path(raw);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn convert_code(raw: &RawFunction, base_dir: &Path) -> Result<Option<CodeSource>> {
    let set: Vec<&str> = [
        ("code_inline", raw.code_inline.is_some()),
        ("code_archive", raw.code_archive.is_some()),
        ("code_path", raw.code_path.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, present)| present.then_some(field))
    .collect();

    if set.len() > 1 {
        bail!("only one code source may be set, found {}", set.join(", "));
    }

    Ok(if let Some(code) = &raw.code_inline {
        Some(CodeSource::Inline(code.clone()))
    } else if let Some(path) = &raw.code_archive {
        Some(CodeSource::Archive(resolve_path(base_dir, path)))
    } else {
        raw.code_path
            .as_deref()
            .map(|path| CodeSource::Directory(resolve_path(base_dir, path)))
    })
}

fn convert_config(raw: &RawConfig) -> Result<FunctionConfig> {
    let defaults = FunctionConfig::default();
    Ok(FunctionConfig {
        memory_mb: check_range(
            "memory_mb",
            raw.memory_mb.unwrap_or(defaults.memory_mb),
            MEMORY_MB_RANGE,
        )?,
        timeout_seconds: check_range(
            "timeout_seconds",
            raw.timeout_seconds.unwrap_or(defaults.timeout_seconds),
            TIMEOUT_SECONDS_RANGE,
        )?,
        replicas: check_range(
            "replicas",
            raw.replicas.unwrap_or(defaults.replicas),
            REPLICAS_RANGE,
        )?,
        hardware_type: match &raw.hardware_type {
            Some(hw) => hw.parse().map_err(anyhow::Error::msg)?,
            None => defaults.hardware_type,
        },
    })
}

fn convert_function(raw: RawFunction, base_dir: &Path) -> Result<FunctionSpec> {
    validate_name(&raw.name)?;
    let code = convert_code(&raw, base_dir)?;

    let runtime = raw.runtime.parse().map_err(anyhow::Error::msg)?;
    let template = match &raw.template {
        Some(t) => t.parse().map_err(anyhow::Error::msg)?,
        None => Default::default(),
    };
    let config = raw.config.as_ref().map(convert_config).transpose()?;

    let handler = raw
        .handler
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HANDLER.to_string());

    for secret in &raw.secrets {
        if secret.is_empty() {
            bail!("secrets must not contain empty names");
        }
    }

    Ok(FunctionSpec {
        name: raw.name,
        runtime,
        template,
        code,
        handler,
        requirements: raw.requirements,
        config,
        environment: raw.environment,
        secrets: raw.secrets,
        labels: raw.labels,
        annotations: raw.annotations,
    })
}

fn convert_secret(raw: RawSecret, lookup: &impl Fn(&str) -> Option<String>) -> Result<SecretSpec> {
    validate_name(&raw.name)?;

    let value = match (raw.value, raw.value_env) {
        (Some(value), None) => value,
        (None, Some(var)) => lookup(&var)
            .with_context(|| format!("environment variable {var} is not set"))?,
        (Some(_), Some(_)) => bail!("set either value or value_env, not both"),
        (None, None) => bail!("one of value or value_env is required"),
    };

    Ok(SecretSpec {
        name: raw.name,
        value,
        namespace: raw.namespace.filter(|ns| !ns.is_empty()),
    })
}
