//! Error types for the VPN editor plugin subsystem

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorPluginError {
    /// Plugin file does not exist
    #[error("plugin file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Plugin file failed the ownership/permission checks
    #[error("untrusted plugin file {}: {reason}", path.display())]
    UntrustedFile { path: PathBuf, reason: String },

    /// Caller-supplied predicate vetoed the file
    #[error("plugin file {} rejected: {reason}", path.display())]
    RejectedByPolicy { path: PathBuf, reason: String },

    /// OS loader could not map the library or resolve the factory
    #[error("cannot load plugin \"{plugin}\": {message}")]
    LoadError { plugin: String, message: String },

    /// Factory returned no instance and gave a reason
    #[error("failed to initialize plugin {plugin}: {message}")]
    FactoryFailed { plugin: String, message: String },

    /// Factory returned no instance and no reason
    #[error("unknown error initializing plugin {0}")]
    UnknownInitError(String),

    /// Instance has an empty name property
    #[error("cannot load VPN plugin in '{0}': missing plugin name")]
    MissingName(String),

    /// Instance advertises a different service
    #[error("cannot load VPN plugin in '{plugin}': invalid service name (expected '{expected}', got '{found}')")]
    ServiceMismatch {
        plugin: String,
        expected: String,
        found: String,
    },

    /// Operation or call not implemented by this plugin
    #[error("the plugin does not support {0}")]
    Unsupported(String),

    /// Caller and plugin disagree about a call signature
    #[error("invalid arguments for call {call}: {detail} (caller and plugin disagree about the call signature)")]
    InvalidArgument { call: String, detail: String },

    /// Plugin call failed with its own diagnostic
    #[error("call {call} failed: {message}")]
    CallFailed { call: String, message: String },

    /// Plugin operation failed
    #[error("{0}")]
    Failed(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl EditorPluginError {
    pub(crate) fn unsupported_call(call: &str) -> Self {
        EditorPluginError::Unsupported(format!("call {}", call))
    }

    pub(crate) fn invalid_argument(call: &str, detail: impl Into<String>) -> Self {
        EditorPluginError::InvalidArgument {
            call: call.to_string(),
            detail: detail.into(),
        }
    }

    /// True for the routine "not implemented here" outcome of capability probing
    pub fn is_unsupported(&self) -> bool {
        matches!(self, EditorPluginError::Unsupported(_))
    }

    /// True when the plugin file is missing, as opposed to being insecure
    pub fn is_not_found(&self) -> bool {
        matches!(self, EditorPluginError::NotFound(_))
    }
}

impl From<serde_json::Error> for EditorPluginError {
    fn from(error: serde_json::Error) -> Self {
        EditorPluginError::ParseError(error.to_string())
    }
}

impl From<toml::de::Error> for EditorPluginError {
    fn from(error: toml::de::Error) -> Self {
        EditorPluginError::ParseError(error.to_string())
    }
}

pub type EditorPluginResult<T> = Result<T, EditorPluginError>;
