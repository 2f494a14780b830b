//! Locates the configuration file.
//!
//! Precedence: `--config` (or `FRAMELINK_CONFIG`, which clap folds into the
//! same flag), then `framelink.toml` in the per-user config directory,
//! overridable through `FRAMELINK_CONFIG_DIR`. A missing default file is not
//! an error; an explicitly named one is.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG: &str = "FRAMELINK_CONFIG";
pub const ENV_CONFIG_DIR: &str = "FRAMELINK_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "framelink";
const APPLICATION: &str = "framelink";
const CONFIG_FILE: &str = "framelink.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

/// Picks the configuration file to load, if any.
pub fn locate_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(Some(path.to_path_buf()));
    }
    let candidate = AppPaths::discover()?.config_file();
    if candidate.is_file() {
        Ok(Some(candidate))
    } else {
        tracing::debug!(path = %candidate.display(), "no configuration file; using defaults");
        Ok(None)
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
