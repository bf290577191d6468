mod publisher;

pub use publisher::EventPublisher;

use crate::action::ActionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Audit/liveness events raised by the three subsystems. Each maps to one
/// wire record on a device's `log` topic, except `ActionStatusChanged`,
/// which maps to `actions/<id>/status` and the periodic `actions/status`
/// digest instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DomainEvent {
    SnapshotCaptured {
        device_id: i64,
        camera_id: i64,
        ext: String,
        timestamp: DateTime<Utc>,
    },
    Heartbeat {
        device_id: i64,
        timestamp: DateTime<Utc>,
    },
    FileSaved {
        device_id: i64,
        path: String,
        timestamp: DateTime<Utc>,
    },
    OperationFailed {
        device_id: i64,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    ActionStatusChanged {
        action_id: i64,
        state: ActionState,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn snapshot_captured(device_id: i64, camera_id: i64, ext: impl Into<String>) -> Self {
        Self::SnapshotCaptured {
            device_id,
            camera_id,
            ext: ext.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn heartbeat(device_id: i64) -> Self {
        Self::Heartbeat {
            device_id,
            timestamp: Utc::now(),
        }
    }

    pub fn file_saved(device_id: i64, path: impl Into<String>) -> Self {
        Self::FileSaved {
            device_id,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn operation_failed(device_id: i64, reason: impl Into<String>) -> Self {
        Self::OperationFailed {
            device_id,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn action_status_changed(action_id: i64, state: ActionState) -> Self {
        Self::ActionStatusChanged {
            action_id,
            state,
            timestamp: Utc::now(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SnapshotCaptured { timestamp, .. }
            | Self::Heartbeat { timestamp, .. }
            | Self::FileSaved { timestamp, .. }
            | Self::OperationFailed { timestamp, .. }
            | Self::ActionStatusChanged { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SnapshotCaptured { .. } => "snapshot",
            Self::Heartbeat { .. } => "heartbeat",
            Self::FileSaved { .. } => "file_saved",
            Self::OperationFailed { .. } => "error",
            Self::ActionStatusChanged { .. } => "action_status",
        }
    }

    /// Renders the `{event, ..., timestamp}` record published on a device's
    /// `log` topic. Not meaningful for `ActionStatusChanged`, which is
    /// published on the Action status topics instead of a device log.
    pub fn to_log_payload(&self) -> serde_json::Value {
        match self {
            Self::SnapshotCaptured {
                camera_id,
                ext,
                timestamp,
                ..
            } => {
                json!({"event": "snapshot", "camera_id": camera_id, "ext": ext, "timestamp": timestamp})
            }
            Self::Heartbeat {
                device_id,
                timestamp,
            } => json!({"event": "heartbeat", "device_id": device_id, "timestamp": timestamp}),
            Self::FileSaved {
                path, timestamp, ..
            } => json!({"event": "file_saved", "path": path, "timestamp": timestamp}),
            Self::OperationFailed {
                reason, timestamp, ..
            } => json!({"event": "error", "reason": reason, "timestamp": timestamp}),
            Self::ActionStatusChanged {
                action_id,
                state,
                timestamp,
            } => {
                json!({"event": "action_status", "action_id": action_id, "state": state.as_str(), "timestamp": timestamp})
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_log_payload_matches_wire_shape() {
        let event = DomainEvent::snapshot_captured(1, 2, "jpg");
        let payload = event.to_log_payload();
        assert_eq!(payload["event"], "snapshot");
        assert_eq!(payload["camera_id"], 2);
        assert_eq!(payload["ext"], "jpg");
        assert!(payload["timestamp"].is_string());
    }

    #[test]
    fn event_type_matches_each_variant() {
        assert_eq!(DomainEvent::heartbeat(1).event_type(), "heartbeat");
        assert_eq!(
            DomainEvent::file_saved(1, "a/b.jpg").event_type(),
            "file_saved"
        );
        assert_eq!(
            DomainEvent::operation_failed(1, "boom").event_type(),
            "error"
        );
        assert_eq!(
            DomainEvent::action_status_changed(1, ActionState::Running).event_type(),
            "action_status"
        );
    }

    #[test]
    fn round_trips_through_serde_json() {
        let event = DomainEvent::heartbeat(42);
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: DomainEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(event, decoded);
    }
}
