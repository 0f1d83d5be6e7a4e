//! # Lifecycle Core Configuration
//!
//! Lets a deployment choose its stage set and catch-up policy from a file
//! instead of code. JSON is always available; YAML and TOML are behind the
//! `yaml-config` and `toml-config` features (both on by default).
//!
//! ```toml
//! stages = ["configure", "start", "drain", "stop"]
//! catch_up = ["configure"]
//! verbose = true
//! ```
pub mod error;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::kernel::error::Result;
use crate::kernel::lifecycle::Lifecycle;
use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::{CatchUpPolicy, Stage, StageSet};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "JSON",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "YAML",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "TOML",
        }
    }
}

/// Predefined stage sets selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// `configure < start < stop`
    #[default]
    Standard,
    /// `configure < start < announce < unannounce < stop`
    ServiceDiscovery,
}

impl Preset {
    pub fn stage_set(self) -> StageSet {
        match self {
            Preset::Standard => StageSet::standard(),
            Preset::ServiceDiscovery => StageSet::service_discovery(),
        }
    }
}

/// One entry of the `stages` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageEntry {
    /// Plain name; position in the list is the order
    Name(Stage),
    /// Name with an explicit ordinal or precedence constraints
    Detailed {
        name: Stage,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ordinal: Option<i64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        after: Vec<Stage>,
    },
}

impl StageEntry {
    pub fn name(&self) -> &Stage {
        match self {
            StageEntry::Name(name) | StageEntry::Detailed { name, .. } => name,
        }
    }

    fn ordinal(&self) -> Option<i64> {
        match self {
            StageEntry::Name(_) => None,
            StageEntry::Detailed { ordinal, .. } => *ordinal,
        }
    }

    fn after(&self) -> &[Stage] {
        match self {
            StageEntry::Name(_) => &[],
            StageEntry::Detailed { after, .. } => after,
        }
    }
}

/// Lifecycle settings as read from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Named stage set; mutually exclusive with `stages`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    /// Custom stage set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageEntry>,
    /// Stages eligible for catch-up. Absent means the first stage only; an
    /// empty list disables catch-up entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch_up: Option<Vec<Stage>>,
    /// Log every action invocation at `info`
    #[serde(default)]
    pub verbose: bool,
}

impl LifecycleConfig {
    /// Configuration for one of the predefined stage sets.
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            preset: Some(preset),
            ..Self::default()
        }
    }

    /// Load a configuration file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loading lifecycle configuration from {}", path.display());
        Self::parse(&data, format)
    }

    /// Deserialize from string based on format
    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self> {
        let parsed: std::result::Result<Self, String> = match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| e.to_string()),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| e.to_string()),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| {
            ConfigError::Parse {
                format: format.name(),
                message,
            }
            .into()
        })
    }

    /// Serialize to string based on format
    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        let rendered: std::result::Result<String, String> = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| e.to_string()),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
        };
        rendered.map_err(|message| {
            ConfigError::Serialize {
                format: format.name(),
                message,
            }
            .into()
        })
    }

    /// Resolve the configured stage set.
    pub fn stage_set(&self) -> Result<StageSet> {
        if self.stages.is_empty() {
            return Ok(self.preset.unwrap_or_default().stage_set());
        }
        if let Some(preset) = self.preset {
            return Err(ConfigError::Conflict {
                reason: format!("both `preset = {preset:?}` and an explicit `stages` list are set"),
            }
            .into());
        }

        let with_ordinal = self.stages.iter().filter(|e| e.ordinal().is_some()).count();
        let with_after = self.stages.iter().filter(|e| !e.after().is_empty()).count();

        let set = if with_ordinal > 0 {
            if with_ordinal != self.stages.len() || with_after > 0 {
                return Err(StageSystemError::MixedStageDefinition {
                    reason: "when one stage has an ordinal, every stage needs one and none may use `after`"
                        .to_string(),
                }
                .into());
            }
            StageSet::from_ordinals(
                self.stages
                    .iter()
                    .map(|e| (e.name().clone(), e.ordinal().unwrap_or_default())),
            )?
        } else if with_after > 0 {
            let constraints = self.stages.iter().flat_map(|entry| {
                entry
                    .after()
                    .iter()
                    .map(move |before| (before.clone(), entry.name().clone()))
            });
            StageSet::from_precedence(self.stages.iter().map(|e| e.name().clone()), constraints)?
        } else {
            StageSet::new(self.stages.iter().map(|e| e.name().clone()))?
        };
        Ok(set)
    }

    /// Resolve the configured catch-up policy.
    pub fn catch_up_policy(&self) -> CatchUpPolicy {
        match &self.catch_up {
            None => CatchUpPolicy::FirstStage,
            Some(stages) if stages.is_empty() => CatchUpPolicy::Never,
            Some(stages) => CatchUpPolicy::Only(stages.clone()),
        }
    }

    /// Build a lifecycle from this configuration.
    pub fn build(&self) -> Result<Lifecycle> {
        Lifecycle::builder()
            .stages(self.stage_set()?)
            .catch_up(self.catch_up_policy())
            .verbose(self.verbose)
            .build()
    }
}
