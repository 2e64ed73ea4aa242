// src/config/loader.rs
//! Layered configuration loader
//!
//! Layers, lowest precedence first: built-in defaults, each configuration
//! file in order, then `EMG_FORCE_*` environment variables. Environment keys
//! separate sections with a double underscore, so
//! `EMG_FORCE_SWEEP__N_SPLITS=5` sets `sweep.n_splits`.

use crate::config::{constants::paths, ExperimentConfig};
use crate::error::{ForceError, ForceResult, IntoForceError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration loader merging defaults, files and environment
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_vars: Option<Vec<(String, String)>>,
    require_files: bool,
}

impl ConfigLoader {
    /// Loader over the conventional optional config locations
    pub fn new() -> Self {
        Self {
            config_paths: vec![
                PathBuf::from(paths::DEFAULT_CONFIG_FILE),
                PathBuf::from(paths::LOCAL_CONFIG_FILE),
            ],
            env_vars: None,
            require_files: false,
        }
    }

    /// Loader over explicit paths; every path must exist
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_vars: None,
            require_files: true,
        }
    }

    /// Use these variables instead of the process environment
    pub fn with_env(mut self, vars: Vec<(String, String)>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    /// Load, merge and validate the configuration
    pub fn load(&self) -> ForceResult<ExperimentConfig> {
        let mut merged = toml::Value::try_from(ExperimentConfig::default())
            .map_err(|e| ForceError::config("config_loader", e.to_string()))?;

        for path in &self.config_paths {
            if !path.exists() {
                if self.require_files {
                    return Err(ForceError::config(
                        "config_loader",
                        format!("configuration file not found: {}", path.display()),
                    ));
                }
                continue;
            }
            info!("Loading configuration from {}", path.display());
            merge_toml_values(&mut merged, load_config_file(path)?);
        }

        let vars = match &self.env_vars {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };
        apply_environment_overrides(&mut merged, &vars);

        let config: ExperimentConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ForceError::config("config_loader", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write `config` as TOML
    pub fn export_config<P: AsRef<Path>>(config: &ExperimentConfig, path: P) -> ForceResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(config)
            .map_err(|e| ForceError::config("config_loader", e.to_string()))?;
        std::fs::write(path, content).storage_err(path)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_config_file(path: &Path) -> ForceResult<toml::Value> {
    let content = std::fs::read_to_string(path).storage_err(path)?;
    toml::from_str(&content).map_err(|e| {
        ForceError::config("config_loader", format!("{}: {}", path.display(), e))
    })
}

/// Tables merge key by key; anything else (arrays included) is replaced
fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match overlay {
        toml::Value::Table(entries) if base.is_table() => {
            let Some(table) = base.as_table_mut() else {
                return;
            };
            for (key, value) in entries {
                match table.get_mut(&key) {
                    Some(existing) => merge_toml_values(existing, value),
                    None => {
                        table.insert(key, value);
                    }
                }
            }
        }
        value => *base = value,
    }
}

fn apply_environment_overrides(config: &mut toml::Value, vars: &[(String, String)]) {
    for (key, raw) in vars {
        let Some(stripped) = key.strip_prefix(paths::ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = stripped
            .split(paths::ENV_SECTION_SEPARATOR)
            .map(|part| part.to_lowercase())
            .collect();
        let Some((last, parents)) = path.split_last() else {
            continue;
        };
        let Some(table) = section_mut(config, parents) else {
            warn!("Ignoring {}: {} is not a section", key, path.join("."));
            continue;
        };

        let value = coerce_env_value(table.get(last), raw);
        debug!("Environment override {} = {}", path.join("."), value);
        table.insert(last.clone(), value);
    }
}

/// Table at `parents`, created on demand
fn section_mut<'a>(config: &'a mut toml::Value, parents: &[String]) -> Option<&'a mut toml::value::Table> {
    let mut current = config;
    for part in parents {
        current = current
            .as_table_mut()?
            .entry(part.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }
    current.as_table_mut()
}

/// Parse `raw` as the type of the value it replaces
///
/// Keys without a current value fall back to guessing integer, float,
/// boolean, then string.
fn coerce_env_value(current: Option<&toml::Value>, raw: &str) -> toml::Value {
    let typed = match current {
        Some(toml::Value::String(_)) => Some(toml::Value::String(raw.to_string())),
        Some(toml::Value::Integer(_)) => raw.parse().ok().map(toml::Value::Integer),
        Some(toml::Value::Float(_)) => raw.parse().ok().map(toml::Value::Float),
        Some(toml::Value::Boolean(_)) => raw.parse().ok().map(toml::Value::Boolean),
        _ => None,
    };
    typed.unwrap_or_else(|| guess_env_value(raw))
}

fn guess_env_value(raw: &str) -> toml::Value {
    if let Ok(int_val) = raw.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = raw.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = raw.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(raw.to_string())
    }
}
