//! Validator configuration
//!
//! Loaded from a JSON file; every field is optional and the defaults give
//! the strict behavior:
//!
//! ```json
//! {
//!   "mixed_update_policy": "reject",
//!   "protect_unset": false,
//!   "allow_global_queries": false,
//!   "log_rejections": true
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event};
use crate::schema::{SchemaError, SchemaResult};

/// Handling of update specs that mix operator keys with plain field keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedUpdatePolicy {
    /// Reject the update
    #[default]
    Reject,
    /// Classify by the first key, as the document store does
    FirstKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub mixed_update_policy: MixedUpdatePolicy,

    /// Reject `$unset` of required fields and shard key fields
    #[serde(default)]
    pub protect_unset: bool,

    /// Default scope for collection queries; `true` lets queries that miss
    /// the shard key through without an explicit override
    #[serde(default)]
    pub allow_global_queries: bool,

    /// Emit a log line for every rejected document or update
    #[serde(default = "default_log_rejections")]
    pub log_rejections: bool,
}

fn default_log_rejections() -> bool {
    true
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            mixed_update_policy: MixedUpdatePolicy::default(),
            protect_unset: false,
            allow_global_queries: false,
            log_rejections: default_log_rejections(),
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SchemaError::config(format!("Failed to read config: {}", e)))?;
        let config = Self::from_json(&content)?;

        let path = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", path.as_str())]);
        Ok(config)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> SchemaResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| SchemaError::config(format!("Invalid config JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.mixed_update_policy, MixedUpdatePolicy::Reject);
        assert!(!config.protect_unset);
        assert!(!config.allow_global_queries);
        assert!(config.log_rejections);
    }

    #[test]
    fn test_empty_object_gives_defaults() {
        assert_eq!(ValidatorConfig::from_json("{}").unwrap(), ValidatorConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"mixed_update_policy": "first_key", "protect_unset": true, "log_rejections": false}}"#
        )
        .unwrap();

        let config = ValidatorConfig::load(file.path()).unwrap();
        assert_eq!(config.mixed_update_policy, MixedUpdatePolicy::FirstKey);
        assert!(config.protect_unset);
        assert!(!config.log_rejections);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = ValidatorConfig::from_json(r#"{"mixed_update_policy": "merge"}"#).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::DgConfigInvalid);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ValidatorConfig::from_json(r#"{"protect": true}"#).unwrap_err();
        assert!(err.message().starts_with("Invalid config JSON"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ValidatorConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.message().starts_with("Failed to read config"));
    }
}
