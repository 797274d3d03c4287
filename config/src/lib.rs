//! Configuration for the insight assistant.
//!
//! Two layers:
//!
//! - [`load_and_apply`] fills the process environment from a project `.env` and the
//!   `[env]` table of `$XDG_CONFIG_HOME/<app>/config.toml`, with priority
//!   **existing env > .env > XDG**.
//! - [`AssistantSettings::from_env`] reads the typed settings (model, endpoint, graph
//!   bounds, checkpoint database) from the resulting environment.

mod dotenv;
mod paths;
mod settings;
mod xdg_toml;

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub use settings::{AssistantSettings, SettingsError};

/// Application name used for the XDG config and data directories.
pub const APP_NAME: &str = "insight";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// Sets every key found in `.env` or the XDG `[env]` table that is not already present
/// in the process environment. Returns the keys that were set.
///
/// * `app_name`: directory under `$XDG_CONFIG_HOME`, normally [`APP_NAME`].
/// * `dotenv_dir`: where to look for `.env`; the current directory when `None`.
pub fn load_and_apply(app_name: &str, dotenv_dir: Option<&Path>) -> Result<Vec<String>, LoadError> {
    let xdg = xdg_toml::load_env_map(app_name)?;
    let dotenv = dotenv::load_env_map(dotenv_dir).map_err(LoadError::DotenvRead)?;

    let mut applied = Vec::new();
    for (key, value) in merge(xdg, dotenv) {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(&key, value);
        applied.push(key);
    }
    applied.sort();
    Ok(applied)
}

/// `.env` entries shadow XDG entries with the same key.
fn merge(xdg: HashMap<String, String>, dotenv: HashMap<String, String>) -> HashMap<String, String> {
    let mut merged = xdg;
    merged.extend(dotenv);
    merged
}


#[cfg(test)]
mod tests {
    use super::test_env::{lock, write_app_config, XdgHome};
    use super::*;
    use std::env;

    /// **Scenario**: A variable already in the process environment keeps its value over `.env`.
    #[test]
    fn existing_env_is_never_overwritten() {
        let _guard = lock();
        let dotenv_dir = tempfile::tempdir().unwrap();
        std::fs::write(dotenv_dir.path().join(".env"), "INSIGHT_TEST_EXISTING=from_dotenv\n").unwrap();
        env::set_var("INSIGHT_TEST_EXISTING", "from_env");

        let applied = load_and_apply("insight-test-no-such-app", Some(dotenv_dir.path())).unwrap();
        assert_eq!(env::var("INSIGHT_TEST_EXISTING").as_deref(), Ok("from_env"));
        assert!(!applied.contains(&"INSIGHT_TEST_EXISTING".to_string()));
        env::remove_var("INSIGHT_TEST_EXISTING");
    }

    /// **Scenario**: With no `.env` and no XDG file, loading applies nothing.
    #[test]
    fn missing_sources_are_not_an_error() {
        let _guard = lock();
        let empty = tempfile::tempdir().unwrap();
        let applied = load_and_apply("insight-test-no-such-app", Some(empty.path())).unwrap();
        assert!(applied.is_empty());
    }

    /// **Scenario**: `.env` wins over the XDG file for the same key; XDG-only keys still apply.
    #[test]
    fn dotenv_shadows_xdg() {
        let _guard = lock();
        let xdg_dir = tempfile::tempdir().unwrap();
        write_app_config(
            xdg_dir.path(),
            APP_NAME,
            "[env]\nINSIGHT_TEST_MODEL = \"from_xdg\"\nINSIGHT_TEST_XDG_ONLY = \"xdg\"\n",
        );
        let dotenv_dir = tempfile::tempdir().unwrap();
        std::fs::write(dotenv_dir.path().join(".env"), "INSIGHT_TEST_MODEL=from_dotenv\n").unwrap();
        env::remove_var("INSIGHT_TEST_MODEL");
        env::remove_var("INSIGHT_TEST_XDG_ONLY");

        let applied = {
            let _xdg = XdgHome::set(xdg_dir.path());
            load_and_apply(APP_NAME, Some(dotenv_dir.path())).unwrap()
        };
        let model = env::var("INSIGHT_TEST_MODEL").unwrap();
        let xdg_only = env::var("INSIGHT_TEST_XDG_ONLY").unwrap();
        env::remove_var("INSIGHT_TEST_MODEL");
        env::remove_var("INSIGHT_TEST_XDG_ONLY");

        assert_eq!(model, "from_dotenv");
        assert_eq!(xdg_only, "xdg");
        assert_eq!(applied, vec!["INSIGHT_TEST_MODEL", "INSIGHT_TEST_XDG_ONLY"]);
    }

    /// **Scenario**: An unparseable XDG config.toml fails the load.
    #[test]
    fn broken_xdg_toml_is_a_parse_error() {
        let _guard = lock();
        let xdg_dir = tempfile::tempdir().unwrap();
        write_app_config(xdg_dir.path(), APP_NAME, "[env\nbroken = \n");
        let _xdg = XdgHome::set(xdg_dir.path());

        let result = load_and_apply(APP_NAME, None);
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }
}
