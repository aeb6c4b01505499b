//! Function resource: desired and observed state.
//!
//! [`FunctionSpec`] is the validated desired state produced by the manifest
//! layer; [`FunctionState`] is what the control plane last reported. The
//! engine turns one into the other.

pub mod changes;
pub mod engine;
pub mod translate;

use faaskit::FunctionStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use changes::{ChangeGroup, ChangeSet};
pub use engine::FunctionEngine;

// ============================================================================
// Limits
// ============================================================================

pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 63;
pub const MEMORY_MB_RANGE: (u32, u32) = (64, 8192);
pub const TIMEOUT_SECONDS_RANGE: (u32, u32) = (1, 900);
pub const REPLICAS_RANGE: (u32, u32) = (1, 5);
pub const DEFAULT_HANDLER: &str = "handle";

// ============================================================================
// Enumerations
// ============================================================================

/// Declares a closed set of wire strings as a Rust enum with `as_str`,
/// `Display`, `FromStr` and string serde.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The value as sent on the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        let accepted: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        format!("unknown {} '{}' (expected one of: {})", $what, s, accepted.join(", "))
                    })
            }
        }
    };
}

wire_enum! {
    /// Language runtime of a function. Fixed at creation.
    RuntimeKind, "runtime" {
        Python311 => "python3.11",
        Node20 => "node20",
        Node18 => "node18",
        CSharp70 => "csharp7.0",
        Php82 => "php8.2",
        Go121 => "go1.21",
        PyTorch212 => "pytorch2.1.2",
        TensorFlow2190 => "tensorflow2.19.0",
        Custom => "custom",
    }
}

wire_enum! {
    /// Request-handling template.
    #[derive(Default)]
    Template, "template" {
        #[default]
        Http => "http",
        Flask => "flask",
        FastApi => "fastapi",
        Node => "node",
        Go => "go",
    }
}

wire_enum! {
    /// Hardware a function runs on. Fixed at creation.
    #[derive(Default)]
    HardwareType, "hardware type" {
        #[default]
        Cpu => "cpu",
        Gpu => "gpu",
    }
}

// ============================================================================
// Desired State
// ============================================================================

/// Where the function code comes from. At most one source per function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CodeSource {
    /// Source text sent as is.
    Inline(String),
    /// Prebuilt zip archive on disk.
    Archive(PathBuf),
    /// Directory zipped at upload time.
    Directory(PathBuf),
}

impl CodeSource {
    /// Short label for plan output.
    pub fn label(&self) -> String {
        match self {
            Self::Inline(code) => format!("inline ({} bytes)", code.len()),
            Self::Archive(path) => format!("archive {}", path.display()),
            Self::Directory(path) => format!("directory {}", path.display()),
        }
    }
}

/// Resource settings of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub memory_mb: u32,
    pub timeout_seconds: u32,
    pub replicas: u32,
    #[serde(default)]
    pub hardware_type: HardwareType,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            memory_mb: 128,
            timeout_seconds: 30,
            replicas: 1,
            hardware_type: HardwareType::default(),
        }
    }
}

/// Validated desired state of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub runtime: RuntimeKind,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub code: Option<CodeSource>,
    pub handler: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub config: Option<FunctionConfig>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl FunctionSpec {
    /// Minimal spec with defaults for everything optional.
    pub fn new(name: impl Into<String>, runtime: RuntimeKind) -> Self {
        Self {
            name: name.into(),
            runtime,
            template: Template::default(),
            code: None,
            handler: DEFAULT_HANDLER.to_string(),
            requirements: None,
            config: None,
            environment: BTreeMap::new(),
            secrets: Vec::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Observed State
// ============================================================================

/// A function as last reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionState {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub runtime: String,
    pub template: String,
    pub handler: String,
    pub invoke_url: String,
    pub status: FunctionStatus,
    pub version: String,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub invocation_count: i64,
    #[serde(default)]
    pub config: Option<faaskit::FunctionConfig>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}
