//! Store configuration.
//!
//! Loaded from `~/.config/polyhedron/config.ron` (or an explicit path), then
//! overridden from the environment. Every field is optional in the file:
//!
//! ```ron
//! (
//!     mode: firebase,
//!     user_id: Some("uid-123"),
//!     schema_version: "1",
//!     namespace_blocks: false,
//! )
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use thiserror::Error;

use crate::constants::{DEFAULT_SCHEMA_VERSION, ENV_MODE, ENV_USER};
use crate::db::{DbError, validate_key};

/// Where the stores keep their state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Mode {
    /// In-process collections only.
    #[default]
    #[serde(rename = "memory")]
    #[strum(serialize = "memory")]
    Memory,
    /// Mirrored against the realtime database.
    #[serde(rename = "firebase", alias = "remote")]
    #[strum(serialize = "firebase", serialize = "remote")]
    Remote,
}

impl Mode {
    /// Parse from string (case-insensitive, "remote" accepted for firebase).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Memory => "memory",
            Mode::Remote => "firebase",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Mode::Remote)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid mode '{0}' (expected memory or firebase)")]
    InvalidMode(String),
    #[error("invalid user id '{0}': {1}")]
    InvalidUser(String, DbError),
}

/// Configuration shared by both stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub mode: Mode,
    /// Authenticated user; remote mode is inert without one.
    pub user_id: Option<String>,
    /// Root segment under `version/` for per-user data.
    pub schema_version: String,
    /// Keep blocks under the user's subtree instead of the shared
    /// top-level `blocks` collection.
    pub namespace_blocks: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Memory,
            user_id: None,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            namespace_blocks: false,
        }
    }
}

impl StoreConfig {
    /// A remote configuration for `user_id`, other fields defaulted.
    pub fn remote(user_id: impl Into<String>) -> Self {
        Self {
            mode: Mode::Remote,
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Parse a RON document.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validated()
    }

    /// Reject a user id that cannot name a single database key.
    fn validated(self) -> Result<Self, ConfigError> {
        if let Some(user_id) = &self.user_id {
            validate_key(user_id).map_err(|e| ConfigError::InvalidUser(user_id.clone(), e))?;
        }
        Ok(self)
    }

    /// Load a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Load the user's config file if present, defaults otherwise.
    pub fn load_default() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading store config");
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Apply `POLYHEDRON_MODE` and `POLYHEDRON_USER` from the environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(
            std::env::var(ENV_MODE).ok().as_deref(),
            std::env::var(ENV_USER).ok(),
        )
    }

    /// Apply explicit overrides; `None` keeps the current value.
    pub fn with_overrides(
        mut self,
        mode: Option<&str>,
        user_id: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(mode) = mode {
            self.mode = Mode::from_str(mode).ok_or_else(|| ConfigError::InvalidMode(mode.to_string()))?;
        }
        if let Some(user_id) = user_id.filter(|u| !u.is_empty()) {
            self.user_id = Some(user_id);
        }
        self.validated()
    }
}

/// Get the config file path (~/.config/polyhedron/config.ron).
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("polyhedron").join("config.ron"))
}
