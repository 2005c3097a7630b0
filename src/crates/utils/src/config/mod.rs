//! Configuration management utilities.
//!
//! Scaffolder configuration comes from an app-config file (YAML or JSON)
//! shaped like the host platform's:
//!
//! ```yaml
//! integrations:
//!   bitbucketCloud:
//!     - username: ${BITBUCKET_USERNAME}
//!       appPassword: ${BITBUCKET_APP_PASSWORD}
//! scaffolder:
//!   defaultAuthor:
//!     name: Scaffolder
//! ```
//!
//! [`AppConfig`] keeps the parsed tree and answers dotted-path lookups such
//! as `get_optional_string("scaffolder.defaultAuthor.name")`. `${VAR}`
//! placeholders in string values are replaced from the environment at load
//! time.
//!
//! # Example
//!
//! ```rust,ignore
//! use utils::config::AppConfig;
//!
//! let config = AppConfig::load("app-config.yaml")?;
//! let message = config.get_optional_string("scaffolder.defaultCommitMessage");
//! ```

use crate::error::{Result, UtilsError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

/// Value of a required environment variable.
pub fn get_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| UtilsError::MissingEnv(key.to_string()))
}

/// Value of an environment variable, or `default` when unset.
pub fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a boolean environment variable (`1`/`true`/`yes`/`on`, case-insensitive).
pub fn get_env_bool_or(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

/// App-config file formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(UtilsError::Config(format!(
                "{} is not a .yaml, .yml or .json file",
                path.display()
            ))),
        }
    }
}

/// Read and deserialize a YAML or JSON file.
pub fn load_config_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;

    let parsed = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(UtilsError::from),
        ConfigFormat::Json => serde_json::from_str(&content).map_err(UtilsError::from),
    };
    parsed.map_err(|e| UtilsError::Config(format!("{}: {}", path.display(), e)))
}

/// Parsed app-config tree with dotted-path accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    root: Value,
}

impl AppConfig {
    /// An empty configuration; every lookup returns `None`.
    pub fn empty() -> Self {
        Self { root: Value::Null }
    }

    /// Wrap an already parsed tree, substituting `${VAR}` placeholders.
    pub fn from_value(mut root: Value) -> Result<Self> {
        substitute_env(&mut root)?;
        Ok(Self { root })
    }

    /// Load and substitute an app-config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let root: Value = load_config_file(path.as_ref())?;
        tracing::debug!("Loaded app config from {:?}", path.as_ref());
        Self::from_value(root)
    }

    /// Raw value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.root, |node, segment| node.get(segment))
            .filter(|value| !value.is_null())
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// String at a dotted path; errors if present with another type.
    pub fn get_string(&self, path: &str) -> Result<Option<String>> {
        match self.get(path) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(UtilsError::Config(format!(
                "Invalid type in config for key '{}', got {}, wanted string",
                path,
                type_name(other)
            ))),
        }
    }

    /// String at a dotted path, `None` when absent or not a string.
    pub fn get_optional_string(&self, path: &str) -> Option<String> {
        self.get_string(path).ok().flatten()
    }

    pub fn get_optional_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    /// Deserialize the subtree at a dotted path.
    pub fn get_typed<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                UtilsError::Config(format!("Invalid config at '{}': {}", path, e))
            }),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Replace `${VAR}` placeholders in every string of the tree.
fn substitute_env(value: &mut Value) -> Result<()> {
    match value {
        Value::String(s) if s.contains("${") => {
            *s = expand_placeholders(s)?;
        }
        Value::Array(items) => {
            for item in items {
                substitute_env(item)?;
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                substitute_env(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn expand_placeholders(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            UtilsError::Config(format!("Unterminated placeholder in config value '{}'", input))
        })?;
        let name = after[..end].trim();
        if name.is_empty() {
            return Err(UtilsError::Config(format!(
                "Empty placeholder in config value '{}'",
                input
            )));
        }
        out.push_str(&get_env(name)?);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Author {
        name: String,
        email: Option<String>,
    }

    fn sample() -> AppConfig {
        AppConfig::from_value(json!({
            "scaffolder": {
                "defaultAuthor": {"name": "Scaffolder", "email": "scaffolder@example.com"},
                "defaultCommitMessage": "Initial commit",
                "signCommits": true
            },
            "integrations": {"gitlab": [{"host": "gitlab.com"}]}
        }))
        .unwrap()
    }

    #[test]
    fn test_get_env_or() {
        let value = get_env_or("NONEXISTENT_VAR_12345", "default");
        assert_eq!(value, "default");
    }

    #[test]
    fn test_get_env_bool_or() {
        assert!(get_env_bool_or("NONEXISTENT_BOOL_VAR_12345", true));
        std::env::set_var("UTILS_TEST_BOOL_FLAG", "Yes");
        assert!(get_env_bool_or("UTILS_TEST_BOOL_FLAG", false));
        std::env::set_var("UTILS_TEST_BOOL_FLAG", "0");
        assert!(!get_env_bool_or("UTILS_TEST_BOOL_FLAG", true));
        std::env::remove_var("UTILS_TEST_BOOL_FLAG");
    }

    #[test]
    fn test_get_env_missing() {
        assert!(get_env("DEFINITELY_NONEXISTENT_VAR_XYZ123").is_err());
    }

    #[test]
    fn test_dotted_lookup() {
        let config = sample();
        assert_eq!(
            config.get_optional_string("scaffolder.defaultAuthor.name"),
            Some("Scaffolder".to_string())
        );
        assert_eq!(config.get_optional_bool("scaffolder.signCommits"), Some(true));
        assert!(config.has("integrations.gitlab"));
        assert!(!config.has("integrations.bitbucketCloud"));
        assert_eq!(config.get_optional_string("scaffolder.missing.deep"), None);
    }

    #[test]
    fn test_get_string_wrong_type() {
        let config = sample();
        let err = config.get_string("scaffolder.defaultAuthor").unwrap_err();
        assert!(err.to_string().contains("wanted string"));
        assert_eq!(config.get_optional_string("scaffolder.defaultAuthor"), None);
    }

    #[test]
    fn test_get_typed() {
        let config = sample();
        let author: Author = config.get_typed("scaffolder.defaultAuthor").unwrap().unwrap();
        assert_eq!(author.name, "Scaffolder");
        assert_eq!(author.email.as_deref(), Some("scaffolder@example.com"));
        assert!(config.get_typed::<Author>("nothing.here").unwrap().is_none());
    }

    #[test]
    fn test_empty_config() {
        let config = AppConfig::empty();
        assert!(config.get("scaffolder").is_none());
    }

    #[test]
    fn test_env_substitution() {
        env::set_var("UTILS_TEST_APP_PASSWORD", "s3cret");
        let config = AppConfig::from_value(json!({
            "integrations": {"bitbucketCloud": [{"appPassword": "${UTILS_TEST_APP_PASSWORD}", "username": "u-${UTILS_TEST_APP_PASSWORD}-x"}]}
        }))
        .unwrap();
        env::remove_var("UTILS_TEST_APP_PASSWORD");

        let entry = &config.get("integrations.bitbucketCloud").unwrap()[0];
        assert_eq!(entry["appPassword"], json!("s3cret"));
        assert_eq!(entry["username"], json!("u-s3cret-x"));
    }

    #[test]
    fn test_env_substitution_missing_var() {
        let result = AppConfig::from_value(json!({"token": "${UTILS_TEST_NEVER_SET_VAR}"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_unterminated_placeholder() {
        let result = AppConfig::from_value(json!({"token": "${OOPS"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_yaml_app_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("app-config.yaml");
        fs::write(
            &config_path,
            "scaffolder:\n  defaultCommitMessage: hello\nintegrations:\n  gitlab:\n    - host: gitlab.example.com\n",
        )
        .unwrap();

        let config = AppConfig::load(&config_path).unwrap();
        assert_eq!(
            config.get_optional_string("scaffolder.defaultCommitMessage"),
            Some("hello".to_string())
        );
    }

    #[test]
    fn test_load_json_app_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("app-config.json");
        fs::write(&config_path, r#"{"scaffolder": {"defaultAuthor": {"name": "Bot"}}}"#).unwrap();

        let config = AppConfig::load(&config_path).unwrap();
        assert_eq!(
            config.get_optional_string("scaffolder.defaultAuthor.name"),
            Some("Bot".to_string())
        );
    }

    #[test]
    fn test_load_config_file_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("app-config.toml");
        fs::write(&config_path, "a = 1").unwrap();

        let result: Result<Value> = load_config_file(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = AppConfig::load("/nonexistent/app-config.yaml");
        assert!(matches!(result, Err(UtilsError::Io(_))));
    }

    #[test]
    fn test_load_yaml_config_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.yaml");
        fs::write(&config_path, "scaffolder: [unclosed").unwrap();

        assert!(AppConfig::load(&config_path).is_err());
    }
}
