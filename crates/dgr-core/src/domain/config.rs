//! Named configuration entries carried by a release plan.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ReleaseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfigKey {
    #[serde(rename = "commitPrefix")]
    CommitPrefix,
    #[serde(rename = "updateDependencyJob")]
    UpdateDependencyJob,
    #[serde(rename = "dryRunJob")]
    DryRunJob,
    #[serde(rename = "remoteRegex")]
    RemoteRegex,
    #[serde(rename = "relativePathExcludeProjectsRegex")]
    RelativePathExcludeProjectRegex,
    #[serde(rename = "relativePathToGitRepoRegex")]
    RelativePathToGitRepoRegex,
    #[serde(rename = "relativePathToGitRepoReplacement")]
    RelativePathToGitRepoReplacement,
    #[serde(rename = "regexParams")]
    RegexParams,
    #[serde(rename = "jobMapping")]
    JobMapping,
    #[serde(rename = "buildWithParamJobs")]
    BuildWithParamJobs,
    #[serde(rename = "initialJson")]
    InitialReleaseJson,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        ConfigKey::CommitPrefix,
        ConfigKey::UpdateDependencyJob,
        ConfigKey::DryRunJob,
        ConfigKey::RemoteRegex,
        ConfigKey::RelativePathExcludeProjectRegex,
        ConfigKey::RelativePathToGitRepoRegex,
        ConfigKey::RelativePathToGitRepoReplacement,
        ConfigKey::RegexParams,
        ConfigKey::JobMapping,
        ConfigKey::BuildWithParamJobs,
        ConfigKey::InitialReleaseJson,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::CommitPrefix => "commitPrefix",
            ConfigKey::UpdateDependencyJob => "updateDependencyJob",
            ConfigKey::DryRunJob => "dryRunJob",
            ConfigKey::RemoteRegex => "remoteRegex",
            ConfigKey::RelativePathExcludeProjectRegex => "relativePathExcludeProjectsRegex",
            ConfigKey::RelativePathToGitRepoRegex => "relativePathToGitRepoRegex",
            ConfigKey::RelativePathToGitRepoReplacement => "relativePathToGitRepoReplacement",
            ConfigKey::RegexParams => "regexParams",
            ConfigKey::JobMapping => "jobMapping",
            ConfigKey::BuildWithParamJobs => "buildWithParamJobs",
            ConfigKey::InitialReleaseJson => "initialJson",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ReleaseError::InvalidArgument(format!("unknown config key: {s}")))
    }
}

/// Config entries of a release plan.
pub type Config = BTreeMap<ConfigKey, String>;

/// Looks up `key`, failing with [`ReleaseError::MissingConfig`].
pub fn require(config: &Config, key: ConfigKey) -> Result<&str> {
    config
        .get(&key)
        .map(String::as_str)
        .ok_or(ReleaseError::MissingConfig(key))
}

/// Splits a list-valued config entry into its non-empty entries.
///
/// Entries are separated by `|` or new lines.
pub fn entries(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(['|', '\n'])
        .map(|e| e.trim_end_matches('\r').trim())
        .filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip_through_str() {
        for key in ConfigKey::ALL {
            assert_eq!(key.as_str().parse::<ConfigKey>().unwrap(), key);
        }
        assert!("nope".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_serde_uses_string_names() {
        let mut config = Config::new();
        config.insert(ConfigKey::CommitPrefix, "[DGR]".to_string());
        let json = serde_json::to_string(&config).expect("serialize");
        assert_eq!(json, r#"{"commitPrefix":"[DGR]"}"#);
    }

    #[test]
    fn test_require_reports_missing_key() {
        let config = Config::new();
        let err = require(&config, ConfigKey::RemoteRegex).unwrap_err();
        assert!(matches!(err, ReleaseError::MissingConfig(ConfigKey::RemoteRegex)));
    }

    #[test]
    fn test_entries_split_on_pipe_and_newline() {
        let parsed: Vec<&str> = entries("a#1|b#2\r\nc#3\n\n").collect();
        assert_eq!(parsed, vec!["a#1", "b#2", "c#3"]);
    }
}
