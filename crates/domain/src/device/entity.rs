use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Time unit carried alongside poll/timeout durations in the topic schema.
///
/// The conversion table is bit-exact with the rest of the core:
/// `ms -> *0.001, sec -> *1, min -> *60, hour -> *3600`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Ms,
    Sec,
    Min,
    Hour,
}

impl TimeUnit {
    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            Self::Ms => value * 0.001,
            Self::Sec => value,
            Self::Min => value * 60.0,
            Self::Hour => value * 3600.0,
        }
    }
}

/// Closed set of comparators an Action's IF/branch node may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }
}

/// Runtime status of a Device as observed through MQTT Ingress / liveness
/// polling. Cached on the Device record, never computed on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Error,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::Offline
    }
}

/// Legal value shape of a topic entry in a TopicSchema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicValueType {
    Bool,
    Enum,
    Number,
    File,
    Json,
    Void,
}

/// A telemetry topic a device emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicEntry {
    #[serde(rename = "type")]
    pub value_type: TopicValueType,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub range: Option<(f64, f64)>,
    #[serde(default)]
    pub comparators: Vec<Comparator>,
    #[serde(default)]
    pub poll_interval: Option<u64>,
    #[serde(default)]
    pub poll_interval_unit: Option<TimeUnit>,
    #[serde(default)]
    pub poll_topic: Option<String>,
    #[serde(default)]
    pub poll_payload: Option<String>,
}

/// A command topic a device accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCommandEntry {
    #[serde(rename = "type")]
    pub value_type: TopicValueType,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub range: Option<(f64, f64)>,
    #[serde(default)]
    pub comparators: Vec<Comparator>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub timeout_unit: Option<TimeUnit>,
    #[serde(default)]
    pub result_topic: Option<String>,
}

/// Per-model description of legal telemetry and command topics.
///
/// Only the `topic` kind of DeviceModel schema is consumed by the core
/// (`config`/`function` schemas belong to the admin API).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicSchema {
    #[serde(default)]
    pub topics: HashMap<String, TopicEntry>,
    #[serde(default)]
    pub command_topics: HashMap<String, TopicCommandEntry>,
}

impl TopicSchema {
    pub fn topic(&self, name: &str) -> Option<&TopicEntry> {
        self.topics.get(name)
    }

    pub fn command_topic(&self, name: &str) -> Option<&TopicCommandEntry> {
        self.command_topics.get(name)
    }
}

/// Names a hardware family; owns the topic schema the core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceModel {
    pub id: i64,
    pub name: String,
    pub topic_schema: TopicSchema,
}

impl DeviceModel {
    /// `true` for the distinguished "Local storage" model name the Storage
    /// Manager treats as the local-filesystem backend.
    pub fn is_local_storage(&self) -> bool {
        self.name.eq_ignore_ascii_case("local storage")
    }
}

/// Read-through view of a persisted device. Created/updated by the admin
/// API; the core only ever mutates `values`, `status` and `last_seen`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub mqtt_client_id: String,
    pub topic_prefix: String,
    pub model_id: i64,
    pub enabled: bool,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub values: serde_json::Value,
    #[serde(default)]
    pub status: DeviceStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub poll_interval: u64,
    pub poll_interval_unit: TimeUnit,
}

impl Device {
    pub fn fully_qualified_topic(&self, topic: &str) -> String {
        format!("{}/{}/{}", self.topic_prefix, self.mqtt_client_id, topic)
    }

    pub fn poll_interval_seconds(&self) -> f64 {
        self.poll_interval_unit.to_seconds(self.poll_interval as f64)
    }

    pub fn base_path(&self) -> String {
        self.parameters
            .get("base_path")
            .and_then(|v| v.as_str())
            .unwrap_or("tmp")
            .trim_matches('/')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_unit_conversion_table() {
        assert_eq!(TimeUnit::Ms.to_seconds(500.0), 0.5);
        assert_eq!(TimeUnit::Sec.to_seconds(5.0), 5.0);
        assert_eq!(TimeUnit::Min.to_seconds(2.0), 120.0);
        assert_eq!(TimeUnit::Hour.to_seconds(1.0), 3600.0);
    }

    #[test]
    fn comparator_round_trip() {
        for c in [
            Comparator::Eq,
            Comparator::Ne,
            Comparator::Lt,
            Comparator::Le,
            Comparator::Gt,
            Comparator::Ge,
        ] {
            assert_eq!(Comparator::from_str(c.as_str()), Some(c));
        }
    }

    #[test]
    fn fully_qualified_topic_joins_prefix_client_and_topic() {
        let device = Device {
            id: 1,
            mqtt_client_id: "sw1".into(),
            topic_prefix: "shellies".into(),
            model_id: 1,
            enabled: true,
            parameters: serde_json::json!({}),
            values: serde_json::json!({}),
            status: DeviceStatus::Online,
            last_seen: None,
            poll_interval: 30,
            poll_interval_unit: TimeUnit::Sec,
        };
        assert_eq!(
            device.fully_qualified_topic("relay/0/command"),
            "shellies/sw1/relay/0/command"
        );
    }

    #[test]
    fn is_local_storage_is_case_insensitive() {
        let model = DeviceModel {
            id: 1,
            name: "Local Storage".into(),
            topic_schema: TopicSchema::default(),
        };
        assert!(model.is_local_storage());
    }
}
