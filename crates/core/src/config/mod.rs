//! TOML configuration: vaults, cache location and logging.

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, default_cache_dir, default_config_path};
pub use types::{ConfigFile, LoggingConfig, ResolvedConfig, ResolvedVault};
