use crate::config::types::{ConfigFile, LoggingConfig, ResolvedConfig, ResolvedVault, VaultEntry};
use shellexpand::full;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use dirs::home_dir;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to read config file {0}: {1}")]
    ReadError(String, #[source] std::io::Error),

    #[error("failed to parse TOML in {0}: {1}")]
    ParseError(String, #[source] toml::de::Error),

    #[error("vault '{0}' not found")]
    VaultNotFound(String),

    #[error("no vaults defined in config")]
    NoVaults,

    #[error("version {0} is unsupported (expected 1)")]
    BadVersion(u32),

    #[error("home directory not available to expand '~'")]
    NoHome,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(
        config_path: Option<&Path>,
        vault_override: Option<&str>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let s = fs::read_to_string(&path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e))?;

        let cf: ConfigFile = toml::from_str(&s)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e))?;

        Self::resolve(cf, vault_override)
    }

    /// Validate a parsed config file and resolve its paths.
    pub fn resolve(
        cf: ConfigFile,
        vault_override: Option<&str>,
    ) -> Result<ResolvedConfig, ConfigError> {
        if cf.version != 1 {
            return Err(ConfigError::BadVersion(cf.version));
        }
        if cf.vaults.is_empty() {
            return Err(ConfigError::NoVaults);
        }

        let active = match vault_override.map(ToOwned::to_owned).or(cf.default_vault.clone()) {
            Some(id) => id,
            None => cf.vaults.keys().next().cloned().ok_or(ConfigError::NoVaults)?,
        };
        if !cf.vaults.contains_key(&active) {
            return Err(ConfigError::VaultNotFound(active));
        }

        let vaults = cf
            .vaults
            .iter()
            .map(|(id, entry)| Self::resolve_vault(id, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let active_root = vaults
            .iter()
            .find(|v| v.id == active)
            .map(|v| v.root.to_string_lossy().to_string())
            .unwrap_or_default();
        let sub = |s: &str| s.replace("{{vault_root}}", &active_root);

        let cache_dir = match &cf.cache.dir {
            Some(dir) => expand_path(&sub(dir))?,
            None => default_cache_dir(),
        };

        // Resolve log file path if present
        let logging = if let Some(ref file) = cf.logging.file {
            let expanded_file = expand_path(&sub(&file.to_string_lossy()))?;
            LoggingConfig {
                level: cf.logging.level.clone(),
                file_level: cf.logging.file_level.clone(),
                file: Some(expanded_file),
            }
        } else {
            cf.logging.clone()
        };

        Ok(ResolvedConfig { active_vault: active, vaults, cache_dir, logging })
    }

    fn resolve_vault(id: &str, entry: &VaultEntry) -> Result<ResolvedVault, ConfigError> {
        let root = expand_path(&entry.root)?;
        let sub = |s: &str| s.replace("{{vault_root}}", &root.to_string_lossy());

        let excluded_folders = entry
            .excluded_folders
            .iter()
            .map(|folder| {
                let expanded = expand_path(&sub(folder))?;
                Ok(if expanded.is_absolute() { expanded } else { root.join(expanded) })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(ResolvedVault {
            id: id.to_string(),
            use_cache: entry.use_cache,
            watch: entry.watch,
            debounce: Duration::from_millis(entry.debounce_ms),
            excluded_folders,
            root,
        })
    }
}

pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("vaultdex").join("config.toml");
    }
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("vaultdex").join("config.toml")
}

/// Default directory for page caches: `~/.cache/vaultdex/` or the platform
/// equivalent.
pub fn default_cache_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CACHE_HOME") {
        return Path::new(&xdg).join("vaultdex");
    }
    dirs::cache_dir()
        .unwrap_or_else(|| home_dir().unwrap_or_else(|| PathBuf::from("~")).join(".cache"))
        .join("vaultdex")
}

fn expand_path(input: &str) -> Result<PathBuf, ConfigError> {
    let expanded = full(input).map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(expanded.to_string()))
}
