use std::env;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, Settings};

pub const CONFIG_FILE_NAME: &str = ".flakedot.toml";
pub const CONFIG_ENV: &str = "FLAKEDOT_CONFIG";

/// Precedence: explicit path, then `FLAKEDOT_CONFIG`, then the closest
/// `.flakedot.toml` above `start`. Explicit locations must exist.
pub fn resolve_config_path(
    start: impl AsRef<Path>,
    config_path: Option<PathBuf>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = config_path {
        return require_file(path).map(Some);
    }

    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return require_file(PathBuf::from(path)).map(Some);
        }
    }

    Ok(find_config_from(start.as_ref()))
}

pub fn load_settings(
    start: impl AsRef<Path>,
    config_path: Option<PathBuf>,
) -> Result<Settings, ConfigError> {
    match resolve_config_path(start, config_path)? {
        Some(path) => load_settings_file(&path),
        None => Ok(Settings::default()),
    }
}

pub fn load_settings_file(path: &Path) -> Result<Settings, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path)?;
    let mut settings: Settings = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    if let (Some(template), Some(parent)) = (settings.render.template.as_ref(), path.parent()) {
        if template.is_relative() {
            settings.render.template = Some(parent.join(template));
        }
    }

    Ok(settings)
}

fn require_file(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ConfigError::ConfigNotFound(path))
    }
}

fn find_config_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|ancestor| ancestor.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
