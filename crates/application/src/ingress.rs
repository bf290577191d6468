use crate::worker_pool::{BoundedQueue, QueueItem};
use domain::device::DeviceRepository;
use domain::DeviceStatus;
use infrastructure::MqttClient;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The single long-lived MQTT session. On connect it subscribes to every
/// enabled device's prefix plus the two model wildcards; on every inbound
/// message it updates the device's cached state and fans the message out
/// to the three subsystem queues without ever blocking on a full one.
///
/// Grounded on `controllers/mqtt.py`'s `_on_connect`/`_on_message`.
pub struct MqttIngress {
    client: MqttClient,
    devices: Arc<dyn DeviceRepository>,
    actions: BoundedQueue,
    camera: BoundedQueue,
    storage: BoundedQueue,
}

impl MqttIngress {
    pub fn new(
        client: MqttClient,
        devices: Arc<dyn DeviceRepository>,
        actions: BoundedQueue,
        camera: BoundedQueue,
        storage: BoundedQueue,
    ) -> Self {
        Self { client, devices, actions, camera, storage }
    }

    pub async fn subscribe_all(&self) -> anyhow::Result<()> {
        self.client.subscribe("shellies/+/+/#").await?;
        self.client.subscribe("cameras/#").await?;
        self.client.subscribe("storage/#").await?;

        for device in self.devices.find_enabled().await? {
            if device.topic_prefix.is_empty() {
                continue;
            }
            let topic = format!("{}/#", device.topic_prefix);
            self.client.subscribe(&topic).await?;
        }
        Ok(())
    }

    /// Runs until the broadcast sender is dropped (never, in practice —
    /// the `MqttClient`'s reconnect loop keeps it alive for the process
    /// lifetime).
    pub async fn run(&self) {
        let mut messages = self.client.subscribe_messages();
        loop {
            match messages.recv().await {
                Ok(msg) => {
                    if let Err(e) = self.handle_message(&msg.topic, &msg.payload).await {
                        error!("error handling MQTT message on {}: {e}", msg.topic);
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("ingress lagged, skipped {skipped} messages");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn handle_message(&self, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() < 3 {
            return Ok(());
        }
        let client_id = parts[1];
        let group = parts[2];

        let Some(device) = self.devices.find_by_client_id(client_id).await? else {
            debug!(client_id, "unknown device, still fanning out");
            self.fan_out(0, topic, payload);
            return Ok(());
        };

        let payload_str = std::str::from_utf8(payload).unwrap_or_default();
        let (values, status) = apply_group_parser(&device.values, group, &parts, payload_str);

        self.devices
            .record_observation(device.id, values, status.unwrap_or(device.status))
            .await?;

        self.fan_out(device.id, topic, payload);
        Ok(())
    }

    fn fan_out(&self, device_id: i64, topic: &str, payload: &[u8]) {
        for queue in [&self.actions, &self.camera, &self.storage] {
            queue.enqueue(QueueItem {
                device_id,
                topic: topic.to_string(),
                payload: payload.to_vec(),
            });
        }
    }
}

/// Mutates a copy of the device's cached `values` per the group-specific
/// parsing rules; returns the new values and, if the group carries a
/// liveness signal, an updated `DeviceStatus`. Unhandled groups are
/// returned unchanged. Mirrors `_on_message`'s topic-specific branches.
fn apply_group_parser(
    current: &serde_json::Value,
    group: &str,
    parts: &[&str],
    payload: &str,
) -> (serde_json::Value, Option<DeviceStatus>) {
    let mut values = current.clone();
    if !values.is_object() {
        values = serde_json::json!({});
    }
    let map = values.as_object_mut().expect("just ensured object");

    match group {
        "relay" if parts.len() == 4 => {
            let ch = parts[3];
            map.entry("relay")
                .or_insert_with(|| serde_json::json!({}))
                .as_object_mut()
                .unwrap()
                .entry(ch)
                .or_insert_with(|| serde_json::json!({}))
                .as_object_mut()
                .unwrap()
                .insert("state".into(), serde_json::json!(payload));
        }
        "relay" if parts.len() >= 5 => {
            let (ch, prop) = (parts[3], parts[4]);
            map.entry("relay")
                .or_insert_with(|| serde_json::json!({}))
                .as_object_mut()
                .unwrap()
                .entry(ch)
                .or_insert_with(|| serde_json::json!({}))
                .as_object_mut()
                .unwrap()
                .insert(prop.into(), serde_json::json!(payload));
        }
        "input" if parts.len() >= 4 => {
            if let Ok(n) = payload.parse::<i64>() {
                map.entry("input")
                    .or_insert_with(|| serde_json::json!({}))
                    .as_object_mut()
                    .unwrap()
                    .insert(parts[3].into(), serde_json::json!(n));
            }
        }
        "input_event" if parts.len() >= 4 => {
            let evt = serde_json::from_str::<serde_json::Value>(payload)
                .unwrap_or_else(|_| serde_json::json!({"event": payload}));
            map.entry("input_event")
                .or_insert_with(|| serde_json::json!({}))
                .as_object_mut()
                .unwrap()
                .insert(parts[3].into(), evt);
        }
        "temperature" | "temperature_f" | "voltage" => {
            if let Ok(v) = payload.parse::<f64>() {
                let truncated = (v * 100.0).trunc() / 100.0;
                map.insert(group.into(), serde_json::json!(truncated));
            }
        }
        "online" => {
            let is_online = payload.trim().eq_ignore_ascii_case("true");
            map.insert("online".into(), serde_json::json!(is_online));
            return (
                values,
                Some(if is_online { DeviceStatus::Online } else { DeviceStatus::Offline }),
            );
        }
        _ => {}
    }

    (values, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_state_sets_nested_field() {
        let (values, status) =
            apply_group_parser(&serde_json::json!({}), "relay", &["shellies", "sw1", "relay", "0"], "on");
        assert_eq!(values["relay"]["0"]["state"], "on");
        assert!(status.is_none());
    }

    #[test]
    fn temperature_truncates_to_two_decimals() {
        let (values, _) = apply_group_parser(
            &serde_json::json!({}),
            "temperature",
            &["shellies", "sw1", "temperature"],
            "21.987",
        );
        assert_eq!(values["temperature"], 21.98);
    }

    #[test]
    fn online_group_yields_device_status() {
        let (values, status) =
            apply_group_parser(&serde_json::json!({}), "online", &["shellies", "sw1", "online"], "true");
        assert_eq!(values["online"], true);
        assert_eq!(status, Some(DeviceStatus::Online));
    }

    #[test]
    fn unhandled_group_leaves_values_untouched() {
        let original = serde_json::json!({"foo": "bar"});
        let (values, status) =
            apply_group_parser(&original, "unknown_group", &["p", "c", "unknown_group"], "x");
        assert_eq!(values, original);
        assert!(status.is_none());
    }
}
