//! Typed assistant settings read from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::paths;

pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("no data directory for the checkpoint database; set INSIGHT_CHECKPOINT_DB")]
    NoDataDir,
}

/// Everything the assistant binary needs besides the fixture data.
///
/// | Variable | Default |
/// |----------|---------|
/// | `OPENAI_MODEL` | `gpt-4o` |
/// | `OPENAI_BASE_URL` | client default |
/// | `OPENAI_API_KEY` | client default (reads the env itself) |
/// | `INSIGHT_MAX_PARSE_CORRECTIONS` | 3 |
/// | `INSIGHT_MAX_GENERATION_ATTEMPTS` | 2 |
/// | `INSIGHT_MAX_ROOT_TOOL_CALLS` | 4 |
/// | `INSIGHT_CHECKPOINT_DB` | `$XDG_DATA_HOME/insight/checkpoints.sqlite` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSettings {
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_parse_corrections: usize,
    pub max_generation_attempts: usize,
    pub max_root_tool_calls: u32,
    pub checkpoint_db: PathBuf,
}

impl AssistantSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let checkpoint_db = match get("INSIGHT_CHECKPOINT_DB") {
            Some(path) => PathBuf::from(path),
            None => paths::data_home()
                .map(|dir| dir.join(crate::APP_NAME).join("checkpoints.sqlite"))
                .ok_or(SettingsError::NoDataDir)?,
        };

        Ok(Self {
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL"),
            api_key: get("OPENAI_API_KEY"),
            max_parse_corrections: parse_or(&get, "INSIGHT_MAX_PARSE_CORRECTIONS", 3)?,
            max_generation_attempts: parse_or(&get, "INSIGHT_MAX_GENERATION_ATTEMPTS", 2)?,
            max_root_tool_calls: parse_or(&get, "INSIGHT_MAX_ROOT_TOOL_CALLS", 4)?,
            checkpoint_db,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, SettingsError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| SettingsError::Invalid { key, value: raw }),
    }
}
