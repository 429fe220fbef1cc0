//! `KEY=VALUE` file parsing.
//!
//! Used for the deployment config (`/etc/walrus/system.conf`), the test
//! guard configs and `/etc/os-release`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Parses `KEY=VALUE` files into a map.
///
/// # Supported Formats
///
/// - Simple: `KEY=value`
/// - Quoted: `KEY="value with spaces"` or `KEY='single quoted'`
/// - Empty: `KEY=`
/// - Comments: `# This is a comment`
/// - Whitespace around equals: `KEY = value`
/// - Shell exports: `export KEY=value`
///
/// When a key repeats, [`parse`](Self::parse) keeps the last occurrence (as
/// when the file is sourced) and [`first`](Self::first) the first one.
///
/// # Example
///
/// ```
/// use netops_setup::config::EnvFileParser;
///
/// let content = r#"
/// # Set by the host bootstrap
/// DEPLOYMENT_TYPE="production"
/// REGION=eu-west
/// "#;
///
/// let vars = EnvFileParser::parse(content).unwrap();
/// assert_eq!(vars.get("DEPLOYMENT_TYPE"), Some(&"production".to_string()));
/// assert_eq!(vars.get("REGION"), Some(&"eu-west".to_string()));
/// ```
pub struct EnvFileParser;

impl EnvFileParser {
    /// Parse file content into a map of variables.
    pub fn parse(content: &str) -> Result<HashMap<String, String>> {
        let mut vars = HashMap::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = Self::parse_line(line) {
                vars.insert(key, value);
            }
        }

        Ok(vars)
    }

    /// Value of the first assignment to `key`, ignoring later ones.
    pub fn first(content: &str, key: &str) -> Option<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(Self::parse_line)
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    fn parse_line(line: &str) -> Option<(String, String)> {
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }

        Some((key.to_string(), Self::unquote(value.trim())))
    }

    fn unquote(value: &str) -> String {
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        if quoted {
            value[1..value.len() - 1].to_string()
        } else {
            value.to_string()
        }
    }

    /// Load and parse a file.
    pub fn load(path: &Path) -> Result<HashMap<String, String>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load a file and return the first assignment to `key`.
    pub fn load_first(path: &Path, key: &str) -> Result<Option<String>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Ok(Self::first(&content, key))
    }

    /// Load and parse a file, returning an empty map if it doesn't exist.
    pub fn load_optional(path: &Path) -> Result<HashMap<String, String>> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(HashMap::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_file() {
        let vars = EnvFileParser::parse("DEPLOYMENT_TYPE=development\nOTHER=1\n").unwrap();

        assert_eq!(vars.get("DEPLOYMENT_TYPE"), Some(&"development".to_string()));
        assert_eq!(vars.get("OTHER"), Some(&"1".to_string()));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let content = r#"
# For production machines:
# DEPLOYMENT_TYPE=production

DEPLOYMENT_TYPE=development
"#;

        let vars = EnvFileParser::parse(content).unwrap();

        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("DEPLOYMENT_TYPE"), Some(&"development".to_string()));
    }

    #[test]
    fn handles_quoted_values() {
        let content = r#"
DOUBLE="double quoted"
SINGLE='single quoted'
LONE="
"#;

        let vars = EnvFileParser::parse(content).unwrap();

        assert_eq!(vars.get("DOUBLE"), Some(&"double quoted".to_string()));
        assert_eq!(vars.get("SINGLE"), Some(&"single quoted".to_string()));
        assert_eq!(vars.get("LONE"), Some(&"\"".to_string()));
    }

    #[test]
    fn handles_empty_values() {
        let vars = EnvFileParser::parse("DEPLOYMENT_TYPE=").unwrap();
        assert_eq!(vars.get("DEPLOYMENT_TYPE"), Some(&"".to_string()));
    }

    #[test]
    fn keeps_equals_inside_values() {
        let vars = EnvFileParser::parse("URL=https://example.com?foo=bar").unwrap();
        assert_eq!(
            vars.get("URL"),
            Some(&"https://example.com?foo=bar".to_string())
        );
    }

    #[test]
    fn strips_export_prefix_and_whitespace() {
        let vars = EnvFileParser::parse("export MODE = production").unwrap();
        assert_eq!(vars.get("MODE"), Some(&"production".to_string()));
    }

    #[test]
    fn last_occurrence_wins() {
        let vars = EnvFileParser::parse("A=1\nA=2\n").unwrap();
        assert_eq!(vars.get("A"), Some(&"2".to_string()));
    }

    #[test]
    fn first_keeps_earliest_assignment() {
        let content = "# A=commented\nexport A=\"1\"\nB=x\nA=2\n";
        assert_eq!(EnvFileParser::first(content, "A"), Some("1".to_string()));
        assert_eq!(EnvFileParser::first(content, "C"), None);
    }

    #[test]
    fn ignores_lines_without_key() {
        let vars = EnvFileParser::parse("=value\nnot a pair\nK=v").unwrap();
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn load_reports_path_on_failure() {
        let err = EnvFileParser::load(Path::new("/nonexistent/system.conf")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/system.conf"));
    }

    #[test]
    fn load_optional_returns_empty_for_missing_file() {
        let result = EnvFileParser::load_optional(Path::new("/nonexistent/path/.env"));

        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }
}
