//! Jenkins JSON API response types.
//!
//! Only the fields the relay uses are modelled; Jenkins adds many more.

use chrono::{DateTime, TimeZone, Utc};
use jenkins_relay_core::{ParameterDefinition, ParameterKind};
use serde::Deserialize;

/// Reference to a build inside another response.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRef {
    pub number: u64,
    #[serde(default)]
    pub url: String,
}

/// `GET /job/{name}/api/json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub property: Vec<JobProperty>,
}

/// One entry of a job's `property` array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProperty {
    #[serde(default)]
    pub parameter_definitions: Vec<RawParameterDefinition>,
}

/// Parameter definition as Jenkins reports it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParameterDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_parameter_value: Option<DefaultParameterValue>,
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultParameterValue {
    #[serde(default)]
    pub value: serde_json::Value,
}

impl RawParameterDefinition {
    fn to_definition(&self) -> ParameterDefinition {
        let default_value = self
            .default_parameter_value
            .as_ref()
            .and_then(|default| match &default.value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            });

        ParameterDefinition {
            name: self.name.clone(),
            kind: ParameterKind::from_jenkins_type(&self.kind),
            default_value,
            description: self.description.clone().filter(|d| !d.is_empty()),
            choices: self.choices.clone(),
        }
    }
}

impl JobInfo {
    /// Parameters the job declares, in declaration order.
    #[must_use]
    pub fn parameter_definitions(&self) -> Vec<ParameterDefinition> {
        self.property
            .iter()
            .flat_map(|property| &property.parameter_definitions)
            .map(RawParameterDefinition::to_definition)
            .collect()
    }

    /// Returns `true` if the job takes build parameters.
    #[must_use]
    pub fn is_parameterized(&self) -> bool {
        self.property
            .iter()
            .any(|property| !property.parameter_definitions.is_empty())
    }

    /// Returns `true` if the job has been disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.color.as_deref() == Some("disabled")
    }
}

/// `GET /queue/item/{id}/api/json`
#[derive(Debug, Clone, Deserialize)]
pub struct QueueItem {
    pub id: u64,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub why: Option<String>,
    #[serde(default)]
    pub executable: Option<BuildRef>,
}

impl QueueItem {
    /// The build this queue item turned into, once it has started.
    #[must_use]
    pub fn started_build(&self) -> Option<&BuildRef> {
        self.executable
            .as_ref()
            .filter(|executable| !executable.url.is_empty())
    }
}

/// An archived build artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub file_name: String,
    pub relative_path: String,
}

/// `GET /job/{name}/{number}/api/json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub number: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
    /// Start time in milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl BuildRecord {
    /// Build start time, if Jenkins reported one.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        if self.timestamp <= 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Result text for chat, `IN PROGRESS` while the build is running.
    #[must_use]
    pub fn status(&self) -> &str {
        match (&self.result, self.building) {
            (Some(result), false) => result.as_str(),
            _ => "IN PROGRESS",
        }
    }
}

/// One entry of `GET /pluginManager/api/json?depth=1`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub has_update: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PluginList {
    #[serde(default)]
    pub plugins: Vec<PluginInfo>,
}
