//! Provider settings: endpoint, credentials, timeouts and poll pacing.
//!
//! Settings are layered, later layers winning per field:
//! 1. the user config file (`~/.config/faasform/config.toml`, `[provider]` table)
//! 2. the `[provider]` table of the manifest
//! 3. environment variables and command-line flags

use anyhow::{Context, Result, bail};
use declarative::WaitPolicy;
use faaskit::{DEFAULT_ENDPOINT, HttpSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MANIFEST: &str = "faasform.toml";
pub const DEFAULT_STATE: &str = ".faasform/state.json";

pub const ENV_ENDPOINT: &str = "FAAS_API_ENDPOINT";
pub const ENV_AUTH_TOKEN: &str = "FAAS_AUTH_TOKEN";
pub const ENV_API_KEY: &str = "FAAS_API_KEY";

// ============================================================================
// Raw Settings
// ============================================================================

/// One layer of provider settings, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSection {
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
    pub api_key: Option<String>,
    /// Timeout of a single HTTP request, e.g. "60s"
    pub request_timeout: Option<String>,
    /// First delay between status checks, e.g. "2s"
    pub poll_interval: Option<String>,
    /// Upper bound of the delay between status checks, e.g. "10s"
    pub max_poll_interval: Option<String>,
    #[serde(default)]
    pub timeouts: TimeoutsSection,
}

/// Operation deadlines as duration strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutsSection {
    pub create: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
}

impl ProviderSection {
    /// Overlay `other` on top of `self`; set fields of `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            endpoint: other.endpoint.or(self.endpoint),
            auth_token: other.auth_token.or(self.auth_token),
            api_key: other.api_key.or(self.api_key),
            request_timeout: other.request_timeout.or(self.request_timeout),
            poll_interval: other.poll_interval.or(self.poll_interval),
            max_poll_interval: other.max_poll_interval.or(self.max_poll_interval),
            timeouts: TimeoutsSection {
                create: other.timeouts.create.or(self.timeouts.create),
                update: other.timeouts.update.or(self.timeouts.update),
                delete: other.timeouts.delete.or(self.timeouts.delete),
            },
        }
    }
}

/// File layout of the user config.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    provider: ProviderSection,
}

/// Path of the user config file
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("faasform").join("config.toml"))
}

/// Load the `[provider]` table of the user config, if the file exists
pub fn load_user_section() -> Result<ProviderSection> {
    match user_config_path() {
        Some(path) if path.exists() => load_section_from(&path),
        _ => Ok(ProviderSection::default()),
    }
}

fn load_section_from(path: &Path) -> Result<ProviderSection> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read config file: {}", path.display()))?;
    let config: UserConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid TOML format in {}", path.display()))?;
    log::debug!("Loaded provider settings from {}", path.display());
    Ok(config.provider)
}

// ============================================================================
// Resolved Settings
// ============================================================================

/// Deadlines for the three long-running operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(10 * 60),
            update: Duration::from_secs(10 * 60),
            delete: Duration::from_secs(5 * 60),
        }
    }
}

/// Fully resolved provider settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub auth_token: String,
    pub api_key: String,
    pub request_timeout: Duration,
    pub timeouts: Timeouts,
    /// Pacing of status checks; the timeout is set per operation.
    pub pacing: WaitPolicy,
}

impl ProviderConfig {
    /// Resolve a merged section, applying defaults.
    ///
    /// Credentials may be empty here; [`ProviderConfig::require_credentials`]
    /// checks them once a command actually talks to the API.
    pub fn resolve(section: ProviderSection) -> Result<Self> {
        let duration = |field: &str, value: Option<&String>, default: Duration| -> Result<Duration> {
            match value {
                Some(v) => parse_duration(v).with_context(|| format!("Invalid provider.{field}")),
                None => Ok(default),
            }
        };

        let defaults = Timeouts::default();
        let pacing_defaults = WaitPolicy::default();

        let timeouts = Timeouts {
            create: duration("timeouts.create", section.timeouts.create.as_ref(), defaults.create)?,
            update: duration("timeouts.update", section.timeouts.update.as_ref(), defaults.update)?,
            delete: duration("timeouts.delete", section.timeouts.delete.as_ref(), defaults.delete)?,
        };
        let interval = duration(
            "poll_interval",
            section.poll_interval.as_ref(),
            pacing_defaults.interval,
        )?;
        let max_interval = duration(
            "max_poll_interval",
            section.max_poll_interval.as_ref(),
            pacing_defaults.max_interval,
        )?;
        if max_interval < interval {
            bail!("provider.max_poll_interval must not be shorter than provider.poll_interval");
        }

        Ok(Self {
            endpoint: section
                .endpoint
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            auth_token: section.auth_token.unwrap_or_default(),
            api_key: section.api_key.unwrap_or_default(),
            request_timeout: duration(
                "request_timeout",
                section.request_timeout.as_ref(),
                Duration::from_secs(60),
            )?,
            timeouts,
            pacing: WaitPolicy {
                interval,
                max_interval,
                ..pacing_defaults
            },
        })
    }

    /// Fail unless both credentials are set
    pub fn require_credentials(&self) -> Result<()> {
        if self.auth_token.is_empty() {
            bail!("Missing auth token: set {ENV_AUTH_TOKEN}, --auth-token or provider.auth_token");
        }
        if self.api_key.is_empty() {
            bail!("Missing API key: set {ENV_API_KEY}, --api-key or provider.api_key");
        }
        Ok(())
    }

    /// Settings for the HTTP transport
    pub fn http_settings(&self) -> HttpSettings {
        let mut settings = HttpSettings::new(&self.auth_token, &self.api_key).endpoint(&self.endpoint);
        settings.request_timeout = self.request_timeout;
        settings
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a duration like "90s", "10m", "1h30m" or "500ms"
///
/// A bare number is taken as seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        bail!("Empty duration");
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            bail!("Invalid duration '{input}': expected a number");
        }
        let value: u64 = rest[..digits]
            .parse()
            .with_context(|| format!("Invalid duration '{input}'"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            unit => bail!("Invalid duration '{input}': unknown unit '{unit}' (use ms, s, m or h)"),
        };
        total = match part.and_then(|part| total.checked_add(part)) {
            Some(total) => total,
            None => bail!("Invalid duration '{input}': too large"),
        };
        rest = &rest[unit_len..];
    }
    Ok(total)
}

/// Expand `~` and environment variables in a path from the command line or manifest
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}
