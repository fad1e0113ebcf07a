//! Configuration management.
//!
//! Configuration is stored in TOML format. The search order is:
//! 1. an explicit path (`--config`)
//! 2. `./acton-tools-agent.toml` (project-local)
//! 3. `~/.config/acton-tools-agent/config.toml` (XDG config)
//!
//! `SYSTEM_MESSAGE` and `MAX_ITERATIONS` in the environment override the file;
//! the API key is read from the variable named by `provider.api_key_env`.
//!
//! # Example Configuration
//!
//! ```toml
//! [agent]
//! max_iterations = 5
//! temperature = 0.0
//!
//! [provider]
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [tools.calculator]
//! type = "calculator"
//!
//! [tools.code_execution]
//! type = "code_execution"
//! [tools.code_execution.config]
//! default_timeout_secs = 10
//! allowed_modules = ["math", "json"]
//! ```
//!
//! Without a `[tools]` table every built-in tool is enabled with defaults.

mod file;
mod types;

pub use file::{from_path, from_str, load, search_paths, xdg_config_dir};
pub use types::{AppConfig, MAX_ITERATIONS_ENV, SYSTEM_MESSAGE_ENV};
