//! Load prompts from the embedded YAML, optionally overridden by a directory.
//!
//! **Canonical source**: default prompt text lives in `insight/prompts/*.yaml`; it is
//! embedded at compile time. An override directory (explicit or `PROMPTS_DIR`) may
//! contain any of the same files with any subset of keys; present keys replace the
//! embedded ones, nested mappings merge key by key.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use super::Prompts;

/// Embedded default YAML (canonical source: `insight/prompts/*.yaml`).
macro_rules! embed_prompt_yaml {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}
const EMBED_TAXONOMY: &str = embed_prompt_yaml!("taxonomy.yaml");
const EMBED_INSIGHTS: &str = embed_prompt_yaml!("insights.yaml");
const EMBED_ROOT: &str = embed_prompt_yaml!("root.yaml");
const EMBED_MEMORY: &str = embed_prompt_yaml!("memory.yaml");

const TAXONOMY_FILE: &str = "taxonomy.yaml";
const INSIGHTS_FILE: &str = "insights.yaml";
const ROOT_FILE: &str = "root.yaml";
const MEMORY_FILE: &str = "memory.yaml";

/// Error when loading prompts (missing dir, unreadable file, invalid YAML).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

/// Returns `dir` if given, else `PROMPTS_DIR`, else `None`.
fn prompts_dir(dir: Option<&Path>) -> Option<PathBuf> {
    dir.map(PathBuf::from)
        .or_else(|| std::env::var("PROMPTS_DIR").ok().map(PathBuf::from))
}

fn parse(path: &str, content: &str) -> Result<Value, LoadError> {
    serde_yaml::from_str(content).map_err(|e| LoadError::ParseYaml {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Reads an override file; a missing file yields `None`.
fn read_override(dir: &Path, name: &str) -> Result<Option<Value>, LoadError> {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(content) => parse(&path.display().to_string(), &content).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LoadError::ReadFile {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
    }
}

/// Merges `over` into `base`: mappings merge per key, anything else replaces.
fn merge(base: &mut Value, over: Value) {
    match (base, over) {
        (Value::Mapping(base), Value::Mapping(over)) => {
            for (k, v) in over {
                match base.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        base.insert(k, v);
                    }
                }
            }
        }
        (base, over) => *base = over,
    }
}

fn section<T: DeserializeOwned>(
    name: &str,
    embedded: &str,
    dir: Option<&Path>,
) -> Result<T, LoadError> {
    let mut value = parse(name, embedded)?;
    if let Some(dir) = dir {
        if let Some(over) = read_override(dir, name)? {
            merge(&mut value, over);
        }
    }
    serde_yaml::from_value(value).map_err(|e| LoadError::ParseYaml {
        path: name.to_string(),
        message: e.to_string(),
    })
}

fn build(dir: Option<&Path>) -> Result<Prompts, LoadError> {
    Ok(Prompts {
        taxonomy: section(TAXONOMY_FILE, EMBED_TAXONOMY, dir)?,
        insights: section(INSIGHTS_FILE, EMBED_INSIGHTS, dir)?,
        root: section(ROOT_FILE, EMBED_ROOT, dir)?,
        memory: section(MEMORY_FILE, EMBED_MEMORY, dir)?,
    })
}

/// Loads prompts: embedded defaults, overridden by `dir` (or `PROMPTS_DIR`) when set.
///
/// An explicitly configured directory that does not exist is an error.
pub fn load(dir: Option<&Path>) -> Result<Prompts, LoadError> {
    match prompts_dir(dir) {
        Some(base) => {
            if !base.is_dir() {
                return Err(LoadError::DirNotFound(base.display().to_string()));
            }
            build(Some(&base))
        }
        None => build(None),
    }
}

/// Loads prompts from `dir` if possible, otherwise the embedded defaults.
pub fn load_or_default(dir: Option<&Path>) -> Result<Prompts, LoadError> {
    load(dir).or_else(|_| build(None))
}

impl Prompts {
    /// Embedded defaults only, ignoring `PROMPTS_DIR`.
    pub fn embedded() -> Result<Self, LoadError> {
        build(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: The embedded YAML parses into every prompt section.
    #[test]
    fn embedded_prompts_parse() {
        let p = Prompts::embedded().unwrap();
        assert!(p.taxonomy.react_format.contains("{{tool_names}}"));
        assert!(p.insights.trends.planner_system.contains("{{react_format}}"));
        assert_eq!(p.root.docs_continuation_marker, "[continue]");
        assert!(!p.memory.collector_system.is_empty());
    }

    /// **Scenario**: Load with a non-existent directory returns DirNotFound.
    #[test]
    fn load_nonexistent_dir_returns_error() {
        let result = load(Some(Path::new("/nonexistent_prompts_dir_12345")));
        assert!(matches!(result.unwrap_err(), LoadError::DirNotFound(_)));
    }

    /// **Scenario**: An override file replaces only the keys it names, including nested ones.
    #[test]
    fn load_override_merges_keys() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("taxonomy.yaml"),
            "react_malformed_json: \"Fix your JSON.\"\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("insights.yaml"),
            "funnel:\n  generator_system: \"Funnel from file.\"\n",
        )
        .unwrap();
        let p = load(Some(temp.path())).unwrap();
        let embedded = Prompts::embedded().unwrap();
        assert_eq!(p.taxonomy.react_malformed_json, "Fix your JSON.");
        assert_eq!(p.taxonomy.react_format, embedded.taxonomy.react_format);
        assert_eq!(p.insights.funnel.generator_system, "Funnel from file.");
        assert_eq!(
            p.insights.funnel.planner_system,
            embedded.insights.funnel.planner_system
        );
    }

    /// **Scenario**: Invalid YAML in an override file is a ParseYaml error; load_or_default falls back.
    #[test]
    fn load_invalid_yaml_returns_parse_error() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("root.yaml"), "root_system: [not closed").unwrap();
        let err = load(Some(temp.path())).unwrap_err();
        assert!(matches!(err, LoadError::ParseYaml { .. }));
        let p = load_or_default(Some(temp.path())).unwrap();
        assert!(p.root.root_system.contains("create_and_query_insight"));
    }
}
