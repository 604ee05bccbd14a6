//! Per-run execution flags and the named presets built from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

pub const DEFAULT_ACTOR_ID_PREFIX: &str = "workflow_";

/// Execution-mode flags for one workflow run.
///
/// Pure data; the executor and the tasks interpret the flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Update objects already registered under the same `actor_id`
    /// instead of creating new ones.
    pub upsert_mode: bool,
    /// Clear the scene before the first task runs.
    pub clear_before_execute: bool,
    /// Save the scene after the last task runs.
    #[serde(alias = "save_level_after")]
    pub save_after: bool,
    /// Label prefix for objects created through the identity registry.
    pub actor_id_prefix: String,
    /// Free-form settings carried along for custom tasks.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            upsert_mode: false,
            clear_before_execute: false,
            save_after: false,
            actor_id_prefix: DEFAULT_ACTOR_ID_PREFIX.to_owned(),
            metadata: Map::new(),
        }
    }
}

impl WorkflowConfig {
    /// Build the configuration for a preset name such as `"incremental-update"`.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        Ok(name.parse::<Preset>()?.config())
    }

    /// Check the flags are usable before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.actor_id_prefix;
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::InvalidPrefix(prefix.clone()));
        }
        // An empty prefix would claim every labelled object in the scene.
        if self.upsert_mode && prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        Ok(())
    }
}

impl fmt::Display for WorkflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clear={} upsert={} save={} prefix='{}'",
            self.clear_before_execute, self.upsert_mode, self.save_after, self.actor_id_prefix
        )
    }
}

/// Fixed flag combinations selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Default,
    /// Wipe the scene, then create everything fresh.
    ClearAndReplace,
    /// Keep the scene and update objects in place.
    IncrementalUpdate,
    /// Update in place, then persist the scene.
    SafeWithSave,
    /// Rebuild from a cleared scene, then persist it.
    Production,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Default,
        Preset::ClearAndReplace,
        Preset::IncrementalUpdate,
        Preset::SafeWithSave,
        Preset::Production,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::ClearAndReplace => "clear-and-replace",
            Preset::IncrementalUpdate => "incremental-update",
            Preset::SafeWithSave => "safe-with-save",
            Preset::Production => "production",
        }
    }

    pub fn config(self) -> WorkflowConfig {
        let base = WorkflowConfig::default();
        match self {
            Preset::Default => base,
            Preset::ClearAndReplace => WorkflowConfig {
                clear_before_execute: true,
                ..base
            },
            Preset::IncrementalUpdate => WorkflowConfig {
                upsert_mode: true,
                ..base
            },
            Preset::SafeWithSave => WorkflowConfig {
                upsert_mode: true,
                save_after: true,
                ..base
            },
            Preset::Production => WorkflowConfig {
                clear_before_execute: true,
                save_after: true,
                ..base
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Preset::Default),
            "clear-and-replace" | "clean_slate" => Ok(Preset::ClearAndReplace),
            "incremental-update" | "incremental" => Ok(Preset::IncrementalUpdate),
            "safe-with-save" => Ok(Preset::SafeWithSave),
            "production" => Ok(Preset::Production),
            other => Err(ConfigError::UnknownPreset {
                name: other.to_owned(),
                available: Preset::ALL.map(Preset::name).join(", "),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: WorkflowConfig = serde_json::from_value(json!({ "upsert_mode": true })).unwrap();
        assert!(cfg.upsert_mode);
        assert!(!cfg.clear_before_execute);
        assert!(!cfg.save_after);
        assert_eq!(cfg.actor_id_prefix, "workflow_");
    }

    #[test]
    fn legacy_save_key_is_accepted() {
        let cfg: WorkflowConfig =
            serde_json::from_value(json!({ "save_level_after": true })).unwrap();
        assert!(cfg.save_after);
    }

    #[test]
    fn presets_are_plain_flag_combinations() {
        let c = WorkflowConfig::preset("clear-and-replace").unwrap();
        assert!(c.clear_before_execute && !c.upsert_mode && !c.save_after);

        let c = WorkflowConfig::preset("incremental").unwrap();
        assert!(c.upsert_mode && !c.clear_before_execute);

        let c = WorkflowConfig::preset("safe-with-save").unwrap();
        assert!(c.upsert_mode && c.save_after && !c.clear_before_execute);
    }

    #[test]
    fn production_clears_and_saves_without_upsert() {
        let c = WorkflowConfig::preset("production").unwrap();
        assert!(c.clear_before_execute);
        assert!(!c.upsert_mode);
        assert!(c.save_after);
        assert_ne!(c, WorkflowConfig::preset("safe-with-save").unwrap());
        assert_eq!("production".parse::<Preset>().unwrap(), Preset::Production);
        assert!(Preset::ALL.contains(&Preset::Production));
    }

    #[test]
    fn unknown_preset_lists_available_names() {
        let err = WorkflowConfig::preset("turbo").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("turbo"));
        assert!(msg.contains("incremental-update"));
    }

    #[test]
    fn validate_rejects_bad_prefixes() {
        let mut cfg = WorkflowConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.actor_id_prefix = "has space".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidPrefix(_))));

        cfg.actor_id_prefix.clear();
        assert!(cfg.validate().is_ok());
        cfg.upsert_mode = true;
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyPrefix));
    }
}
