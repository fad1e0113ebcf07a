//! Configuration file loading.
//!
//! This module handles loading configuration from TOML files at
//! XDG-compliant locations.

use crate::config::types::AppConfig;
use crate::error::AgentError;
use std::path::{Path, PathBuf};

/// Default configuration file name for project-local config.
const LOCAL_CONFIG_NAME: &str = "acton-tools-agent.toml";

/// Default configuration file name within XDG config directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application name for XDG directory lookup.
const APP_NAME: &str = "acton-tools-agent";

/// Loads configuration.
///
/// Search order:
/// 1. `explicit`, when given (it must exist)
/// 2. `./acton-tools-agent.toml` (project-local)
/// 3. `~/.config/acton-tools-agent/config.toml` (XDG config)
///
/// Returns the defaults if no config file is found. Environment overrides are
/// applied afterwards in every case.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be read or parsed, or
/// an environment override is malformed.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, AgentError> {
    let mut config = match explicit {
        Some(path) => from_path(path)?,
        None => match search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                from_path(&path)?
            }
            None => AppConfig::default(),
        },
    };

    config.apply_env()?;
    Ok(config)
}

/// Loads configuration from a specific file path.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The file contains invalid TOML
/// - The TOML doesn't match the expected schema
pub fn from_path(path: &Path) -> Result<AppConfig, AgentError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AgentError::configuration(
            "config_file",
            format!("failed to read '{}': {}", path.display(), e),
        )
    })?;

    from_str(&contents).map_err(|e| {
        AgentError::configuration(
            "config_file",
            format!("failed to parse '{}': {}", path.display(), e),
        )
    })
}

/// Parses configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or doesn't match the schema.
///
/// # Example
///
/// ```rust
/// use acton_tools_agent::config::from_str;
///
/// let config = from_str("[agent]\nmax_iterations = 3").unwrap();
/// assert_eq!(config.agent.max_iterations, 3);
/// ```
pub fn from_str(toml_str: &str) -> Result<AppConfig, AgentError> {
    toml::from_str(toml_str)
        .map_err(|e| AgentError::configuration("config", format!("invalid TOML: {e}")))
}

/// Returns the paths that would be searched for configuration files.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];

    if let Some(dir) = xdg_config_dir() {
        paths.push(dir.join(XDG_CONFIG_NAME));
    }

    paths
}

/// Returns the path to the XDG config directory.
///
/// This is `~/.config/acton-tools-agent` on most systems.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}
