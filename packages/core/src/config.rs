use std::path::Path;

use nodegraph_common::CommonResult;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_NAME: &str = "nodegraph.config.json";

/// Project configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Committed edits kept reachable by undo (0 = unlimited)
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Log invariant violations of every committed snapshot in debug builds
    #[serde(default)]
    pub validate_commits: bool,
}

fn default_max_history() -> usize {
    100
}

impl ProjectConfig {
    /// Load config from a directory
    pub fn load(dir: impl AsRef<Path>) -> CommonResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            // Return default config if none exists
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> CommonResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder-style override of `max_history`
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            validate_commits: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodegraph_common::CommonError;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "maxHistory": 20,
            "validateCommits": true
        }"#;

        let config = ProjectConfig::from_json(json).unwrap();
        assert_eq!(config.max_history, 20);
        assert!(config.validate_commits);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = ProjectConfig::from_json("{}").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.max_history, 100);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectConfig::load(dir.path()).unwrap(), ProjectConfig::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "maxHistory": 0 }"#).unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_history, 0);
        assert!(!config.validate_commits);
    }

    #[test]
    fn test_malformed_config_is_a_json_error() {
        let result = ProjectConfig::from_json("{ maxHistory: }");
        assert!(matches!(result, Err(CommonError::Json(_))));
    }
}
