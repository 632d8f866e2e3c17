//! # Configuration
//!
//! Manager configuration is a [`confique`] config with compiled defaults,
//! resolved in priority order:
//!
//! 1. **Environment variables**: `REV_MODELS_VALIDATION_TIMEOUT_MS`, etc.
//! 2. **TOML file**: passed explicitly to [`ManagerConfig::load`].
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `validation_timeout_ms` | `5000` | Time allowed for async field validators |
//! | `default_limit` | `20` | Page size used by `read` when no limit is given |
//! | `backend_delay_ms` | `0` | Artificial delay for the in-memory backend |

use crate::error::{ModelError, Result};
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_VALIDATION_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LIMIT: usize = 20;

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Milliseconds async validators get to settle before validation fails.
    #[config(default = 5000, env = "REV_MODELS_VALIDATION_TIMEOUT_MS")]
    pub validation_timeout_ms: u64,

    /// Page size for reads that do not pass an explicit limit.
    #[config(default = 20, env = "REV_MODELS_DEFAULT_LIMIT")]
    pub default_limit: usize,

    /// Delay applied by `MemoryBackend::from_config` before every call.
    #[config(default = 0, env = "REV_MODELS_BACKEND_DELAY_MS")]
    pub backend_delay_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            validation_timeout_ms: DEFAULT_VALIDATION_TIMEOUT_MS,
            default_limit: DEFAULT_LIMIT,
            backend_delay_ms: 0,
        }
    }
}

impl ManagerConfig {
    /// Load from the environment, then the optional TOML file, then defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ManagerConfig::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        builder
            .load()
            .map_err(|e| ModelError::config(format!("failed to load manager config: {}", e)))
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }

    pub fn backend_delay(&self) -> Option<Duration> {
        (self.backend_delay_ms > 0).then(|| Duration::from_millis(self.backend_delay_ms))
    }
}
