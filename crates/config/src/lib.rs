//! Configuration loading with env substitution.
//!
//! Config files: `msghub.toml`, `msghub.yaml`, `msghub.yml` or `msghub.json`,
//! searched in `./` then `~/.config/msghub/`.
//!
//! `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders are substituted before
//! parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config, parse_config},
    schema::{ListenerConfig, LoggingConfig, MsghubConfig},
};
