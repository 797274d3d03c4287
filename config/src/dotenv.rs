//! `.env` reader. Applying the values to the process environment happens in the crate root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn dotenv_path(dir: Option<&Path>) -> Option<PathBuf> {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

fn unquote(raw: &str) -> String {
    if raw.len() >= 2 {
        if let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            return inner.replace("\\\"", "\"");
        }
        if let Some(inner) = raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
            return inner.to_string();
        }
    }
    raw.to_string()
}

/// One `KEY=VALUE` line; `None` for blanks, comments and lines without a key.
/// An optional leading `export ` is accepted.
fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), unquote(value.trim())))
}

fn parse_dotenv(content: &str) -> HashMap<String, String> {
    content.lines().filter_map(parse_line).collect()
}

/// Reads `.env` from `dir` (or the current directory). A missing file is an empty map.
pub fn load_env_map(dir: Option<&Path>) -> std::io::Result<HashMap<String, String>> {
    match dotenv_path(dir) {
        Some(path) => Ok(parse_dotenv(&std::fs::read_to_string(path)?)),
        None => Ok(HashMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Comments and blank lines are skipped and `export` prefixes are stripped.
    #[test]
    fn assistant_env_file() {
        let m = parse_dotenv(
            "# model\nOPENAI_MODEL=gpt-4o-mini\n\nexport OPENAI_BASE_URL=\"http://localhost:8080/v1\"\nINSIGHT_MAX_ROOT_TOOL_CALLS=6\n",
        );
        assert_eq!(m.len(), 3);
        assert_eq!(m["OPENAI_MODEL"], "gpt-4o-mini");
        assert_eq!(m["OPENAI_BASE_URL"], "http://localhost:8080/v1");
        assert_eq!(m["INSIGHT_MAX_ROOT_TOOL_CALLS"], "6");
    }

    /// **Scenario**: Single quotes keep text verbatim, double quotes unescape, and a lone quote stays literal.
    #[test]
    fn quoting_rules() {
        let m = parse_dotenv("A='single # kept'\nB=\"say \\\"hi\\\"\"\nC=\"\"\nD=\nE=\"\n");
        assert_eq!(m["A"], "single # kept");
        assert_eq!(m["B"], "say \"hi\"");
        assert_eq!(m["C"], "");
        assert_eq!(m["D"], "");
        assert_eq!(m["E"], "\"");
    }

    /// **Scenario**: Lines with no `=` or an empty key are dropped.
    #[test]
    fn lines_without_key_are_skipped() {
        let m = parse_dotenv("JUST_A_WORD\n=orphan\nOK=1\n");
        assert_eq!(m.len(), 1);
        assert_eq!(m["OK"], "1");
    }

    /// **Scenario**: A directory without `.env` yields an empty map.
    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_map(Some(dir.path())).unwrap().is_empty());
    }

    /// **Scenario**: `.env` is read from the given directory.
    #[test]
    fn reads_file_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "OPENAI_API_KEY=sk-test\n").unwrap();
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.get("OPENAI_API_KEY").map(String::as_str), Some("sk-test"));
    }
}
