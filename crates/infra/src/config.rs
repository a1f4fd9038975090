//! Target policy configuration.
//!
//! Resolution order:
//! 1. `FIELDREP_POLICY_FILE`: JSON document merged over the base preset
//! 2. `FIELDREP_POLICY`: preset name (`value_for_value` | `top_up`)
//! 3. `value_for_value`
//!
//! The base preset of a policy file is its own `"preset"` key, else
//! `FIELDREP_POLICY`, else `value_for_value`. The result is always validated.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use fieldrep_core::DomainError;
use fieldrep_exchange::TargetPolicy;

pub const POLICY_FILE_ENV: &str = "FIELDREP_POLICY_FILE";
pub const POLICY_PRESET_ENV: &str = "FIELDREP_POLICY";
pub const DEFAULT_PRESET: &str = "value_for_value";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown policy preset: {0}")]
    UnknownPreset(String),

    #[error("invalid policy: {0}")]
    Invalid(#[from] DomainError),
}

/// Where a resolved policy came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    Default,
    Preset(String),
    File(PathBuf),
}

/// A validated target policy plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub policy: TargetPolicy,
    pub source: PolicySource,
}

impl PolicyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = std::env::var_os(POLICY_FILE_ENV).map(PathBuf::from);
        let preset = std::env::var(POLICY_PRESET_ENV).ok();
        Self::resolve(file.as_deref(), preset.as_deref())
    }

    pub fn resolve(file: Option<&Path>, preset: Option<&str>) -> Result<Self, ConfigError> {
        let config = match (file, preset) {
            (Some(path), preset) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self {
                    policy: policy_from_json(&raw, preset)?,
                    source: PolicySource::File(path.to_path_buf()),
                }
            }
            (None, Some(name)) => Self {
                policy: preset_policy(name)?,
                source: PolicySource::Preset(name.trim().to_string()),
            },
            (None, None) => Self {
                policy: TargetPolicy::value_for_value(),
                source: PolicySource::Default,
            },
        };

        config.policy.validate()?;
        info!(
            source = ?config.source,
            target_fraction = config.policy.target_fraction,
            "target policy resolved"
        );
        Ok(config)
    }
}

/// Parse a policy document; fields it omits come from the base preset.
pub fn policy_from_json(raw: &str, preset: Option<&str>) -> Result<TargetPolicy, ConfigError> {
    let mut document: Value = serde_json::from_str(raw)?;

    let embedded = document
        .as_object_mut()
        .and_then(|o| o.remove("preset"))
        .and_then(|v| v.as_str().map(str::to_string));
    let base_name = embedded.as_deref().or(preset).unwrap_or(DEFAULT_PRESET);

    let mut merged = serde_json::to_value(preset_policy(base_name)?)?;
    merge(&mut merged, document);

    let policy: TargetPolicy = serde_json::from_value(merged)?;
    policy.validate()?;
    Ok(policy)
}

fn preset_policy(name: &str) -> Result<TargetPolicy, ConfigError> {
    TargetPolicy::preset(name).ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrep_core::ExchangeId;

    #[test]
    fn defaults_to_value_for_value() {
        let config = PolicyConfig::resolve(None, None).unwrap();
        assert_eq!(config.source, PolicySource::Default);
        assert_eq!(config.policy, TargetPolicy::value_for_value());
    }

    #[test]
    fn preset_by_name() {
        let config = PolicyConfig::resolve(None, Some("top_up")).unwrap();
        assert_eq!(config.policy, TargetPolicy::top_up());
        assert_eq!(config.source, PolicySource::Preset("top_up".into()));

        assert!(matches!(
            PolicyConfig::resolve(None, Some("everything_free")),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn json_overrides_merge_over_preset() {
        let policy = policy_from_json(
            r#"{ "tolerance_factor": 0.25, "scoring_weights": { "affinity_bonus": 30.0 } }"#,
            Some("top_up"),
        )
        .unwrap();

        let base = TargetPolicy::top_up();
        assert_eq!(policy.target_fraction, base.target_fraction);
        assert_eq!(policy.tolerance_factor, 0.25);
        assert_eq!(policy.scoring_weights.affinity_bonus, 30.0);
        assert_eq!(policy.scoring_weights.base_score, base.scoring_weights.base_score);
    }

    #[test]
    fn embedded_preset_wins_over_env_preset() {
        let policy = policy_from_json(r#"{ "preset": "top_up" }"#, Some("value_for_value")).unwrap();
        assert_eq!(policy, TargetPolicy::top_up());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            policy_from_json(r#"{ "target_fraction": 1.5 }"#, None),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            policy_from_json(r#"{ "max_results": "many" }"#, None),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reads_policy_file() {
        let path = std::env::temp_dir().join(format!("fieldrep-policy-{}.json", ExchangeId::new()));
        std::fs::write(&path, r#"{ "target_fraction": 0.5 }"#).unwrap();

        let config = PolicyConfig::resolve(Some(&path), None).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.policy.target_fraction, 0.5);
        assert_eq!(config.source, PolicySource::File(path));
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("fieldrep-missing-{}.json", ExchangeId::new()));
        assert!(matches!(
            PolicyConfig::resolve(Some(&path), None),
            Err(ConfigError::Io { .. })
        ));
    }
}
