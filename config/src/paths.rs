//! XDG base directories: `$XDG_*_HOME` when set, else the platform default.

use std::path::PathBuf;

fn from_env_or(var: &str, fallback: Option<PathBuf>) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or(fallback)
}

pub fn config_home() -> Option<PathBuf> {
    from_env_or("XDG_CONFIG_HOME", dirs::config_dir())
}

pub fn data_home() -> Option<PathBuf> {
    from_env_or("XDG_DATA_HOME", dirs::data_dir())
}

/// `<config_home>/<app>/config.toml`.
pub fn config_file(app_name: &str) -> Option<PathBuf> {
    config_home().map(|dir| dir.join(app_name).join("config.toml"))
}
