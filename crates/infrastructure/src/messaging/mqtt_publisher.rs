use crate::messaging::mqtt_client::MqttClient;
use async_trait::async_trait;
use domain::device::DeviceRepository;
use domain::event::EventPublisher;
use domain::DomainEvent;
use std::sync::Arc;

/// Fans `DomainEvent`s out onto the wire topics named in spec.md §6.
/// Device-scoped events resolve `<prefix>/<client_id>/log` through the
/// Device repository; `ActionStatusChanged` publishes directly on the
/// Action status topic, which carries no device context.
pub struct MqttEventPublisher {
    client: MqttClient,
    devices: Arc<dyn DeviceRepository>,
}

impl MqttEventPublisher {
    pub fn new(client: MqttClient, devices: Arc<dyn DeviceRepository>) -> Self {
        Self { client, devices }
    }

    async fn publish_device_log(
        &self,
        device_id: i64,
        payload: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let device = self.devices.find_by_id(device_id).await?;
        let Some(device) = device else {
            tracing::warn!(device_id, "dropping audit event for unknown device");
            return Ok(());
        };
        let topic = device.fully_qualified_topic("log");
        self.client
            .publish(&topic, &payload.to_string(), false)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    }
}

#[async_trait]
impl EventPublisher for MqttEventPublisher {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match &event {
            DomainEvent::ActionStatusChanged { action_id, state, .. } => {
                let topic = format!("actions/{}/status", action_id);
                self.client
                    .publish(&topic, state.as_str(), false)
                    .await
                    .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            }
            DomainEvent::SnapshotCaptured { device_id, .. }
            | DomainEvent::Heartbeat { device_id, .. }
            | DomainEvent::FileSaved { device_id, .. }
            | DomainEvent::OperationFailed { device_id, .. } => {
                self.publish_device_log(*device_id, event.to_log_payload())
                    .await?;
            }
        }
        Ok(())
    }
}
