//! CLI flags, with an optional TOML file layered underneath them.

use std::path::PathBuf;

#[derive(Debug, Clone, serde::Deserialize, Default)]
pub struct RuleEngineConfig {
    pub ruleset_path: Option<PathBuf>,
    pub input_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl RuleEngineConfig {
    /// Read `path` as TOML. Returns a default (all-`None`) config if the
    /// file cannot be read or parsed — callers layer CLI flags over this,
    /// so an unusable config file degrades to "use the flags".
    pub fn from_toml_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "failed to parse config file, ignoring it");
                Self::default()
            }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read config file, ignoring it");
                Self::default()
            }
        }
    }

    /// CLI-supplied values win over anything the file provides.
    pub fn layered_over(self, cli: RuleEngineConfig) -> RuleEngineConfig {
        RuleEngineConfig {
            ruleset_path: cli.ruleset_path.or(self.ruleset_path),
            input_path: cli.input_path.or(self.input_path),
            log_level: cli.log_level.or(self.log_level),
        }
    }
}
