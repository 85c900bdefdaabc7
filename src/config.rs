use serde::Deserialize;
use std::path::{Path, PathBuf};

use thiserror::Error;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default time the completion processor waits for servers, in milliseconds
pub const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 1_000;

/// Default time a cancelled request may still answer before it is given up, in milliseconds
pub const DEFAULT_CANCEL_GRACE_MS: u64 = 5_000;

/// Display text of the sentinel appended to incomplete completion lists
pub const CONTINUE_TYPING_LABEL: &str = "➕ Continue typing for more proposals...";

/// Assist configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AssistConfig {
    pub folding: FoldingConfig,
    pub completion: CompletionConfig,
}

impl AssistConfig {
    /// Build a configuration from a JSON value such as LSP initialization options.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Read a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Folding-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FoldingConfig {
    /// Create `imports` folding ranges collapsed
    pub collapse_imports: bool,
    /// Time a superseded folding request may still answer in milliseconds
    pub cancel_grace_ms: u64,
}

impl Default for FoldingConfig {
    fn default() -> Self {
        Self {
            collapse_imports: false,
            cancel_grace_ms: DEFAULT_CANCEL_GRACE_MS,
        }
    }
}

/// Completion-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionConfig {
    /// Only accept case-sensitive prefix/contains matches
    pub case_sensitive: bool,
    /// Append a "continue typing" sentinel when a server reports an incomplete list
    pub incomplete_as_proposal: bool,
    /// Surface failing servers as non-actionable proposals
    pub errors_as_proposals: bool,
    /// Time to wait for server responses in milliseconds
    pub timeout_ms: u64,
    /// Time a cancelled completion request may still answer in milliseconds
    pub cancel_grace_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            incomplete_as_proposal: false,
            errors_as_proposals: false,
            timeout_ms: DEFAULT_COMPLETION_TIMEOUT_MS,
            cancel_grace_ms: DEFAULT_CANCEL_GRACE_MS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Returns the path to the data directory for lsp-assist.
/// Uses $XDG_DATA_HOME/lsp-assist if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/lsp-assist,
/// or ./lsp-assist if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("lsp-assist.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("lsp-assist")
}
