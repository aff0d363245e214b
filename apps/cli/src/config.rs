//! CLI configuration.
//!
//! Read from `$XDG_CONFIG_HOME/promethium/config.json`, falling back to
//! `~/.config/promethium/config.json`. Every field is optional; command-line
//! flags override the file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use promethium_protocol::DEFAULT_BASE_URL;
use promethium_upload::UploadConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// API root, e.g. `http://localhost:8000/api/v1`.
    pub base_url: String,

    /// Bearer token sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    pub connect_timeout_secs: u64,

    /// Per-request timeout; applies to each chunk transfer.
    pub request_timeout_secs: u64,

    pub upload: UploadConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
            upload: UploadConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads the config from `path`, or from the default location.
    ///
    /// A missing default file yields defaults. A file that fails to parse
    /// is logged and ignored.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_str::<CliConfig>(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    config_base_dir().map(|d| d.join("promethium").join("config.json"))
}

fn config_base_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg));
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    }
}
