use crate::worker_pool::QueueItem;
use base64::Engine;
use domain::device::{DeviceModelRepository, DeviceRepository};
use domain::{DomainEvent, EventPublisher, StorageBackendKind, StorageFolder};
use infrastructure::MqttClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Deserialize)]
struct CreatePayload {
    file: Option<String>,
    #[serde(default = "default_ext")]
    ext: String,
    name: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

fn default_ext() -> String {
    "bin".to_string()
}

/// Folder-by-extension, plus an optional caller-supplied subdirectory.
fn build_relpath(ext: &str, extra: Option<&str>) -> String {
    let folder = StorageFolder::classify(ext);
    match extra.filter(|p| !p.is_empty()) {
        Some(extra) => format!("{}/{}", folder.as_str(), extra.trim_matches('/')),
        None => folder.as_str().to_string(),
    }
}

/// Consumes `…/file/*/create` messages, decodes the base64 artifact,
/// dispatches it to the device's resolved storage backend, and reports
/// success or error on the matching result topic.
///
/// Grounded on `controllers/storage_handler.py`'s `StorageManager`.
pub struct StorageManager {
    client: MqttClient,
    devices: Arc<dyn DeviceRepository>,
    device_models: Arc<dyn DeviceModelRepository>,
    storage_root: String,
    publisher: Arc<dyn EventPublisher>,
}

impl StorageManager {
    pub fn new(
        client: MqttClient,
        devices: Arc<dyn DeviceRepository>,
        device_models: Arc<dyn DeviceModelRepository>,
        storage_root: String,
        publisher: Arc<dyn EventPublisher>,
    ) -> Arc<Self> {
        Arc::new(Self { client, devices, device_models, storage_root, publisher })
    }

    pub fn is_relevant(topic: &str) -> bool {
        topic.ends_with("/create") && topic.contains("/file/")
    }

    pub async fn process(self: &Arc<Self>, item: QueueItem) -> anyhow::Result<()> {
        let parts: Vec<&str> = item.topic.splitn(3, '/').collect();
        if parts.len() < 3 {
            return Ok(());
        }
        let (prefix, client_id) = (parts[0].to_string(), parts[1].to_string());
        self.handle_create(&prefix, &client_id, &item.payload).await;
        Ok(())
    }

    async fn handle_create(&self, prefix: &str, client_id: &str, raw_payload: &[u8]) {
        let result_topic = format!("{prefix}/{client_id}/file/created");

        match self.try_save(prefix, client_id, raw_payload).await {
            Ok(()) => {
                self.client.publish(&result_topic, "\"success\"", false).await.ok();
            }
            Err(e) => {
                error!("file/create failed: {e}");
                self.client.publish(&result_topic, "\"error\"", false).await.ok();
            }
        }
    }

    async fn try_save(&self, prefix: &str, client_id: &str, raw_payload: &[u8]) -> anyhow::Result<()> {
        let payload: CreatePayload = serde_json::from_slice(raw_payload)?;
        let file_b64 = payload.file.ok_or_else(|| anyhow::anyhow!("missing file payload"))?;
        let ext = payload.ext.to_lowercase().trim_matches('.').to_string();
        let name = payload
            .name
            .unwrap_or_else(|| format!("file_{}", chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S")));

        let relpath = build_relpath(&ext, payload.path.as_deref());

        let content = base64::engine::general_purpose::STANDARD.decode(file_b64)?;

        let device = self
            .devices
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no device found for client_id={client_id}"))?;
        let model = self
            .device_models
            .find_by_id(device.model_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no device model for device {}", device.id))?;

        let kind = StorageBackendKind::resolve(&model.name, &device.parameters);
        let filename = format!("{name}.{ext}");
        let full_path = format!("{relpath}/{filename}");

        let mut backend = infrastructure::storage::open_backend(kind, &device, &self.storage_root).await?;
        backend.mkdirs(&relpath).await?;
        backend.put(&full_path, &content).await?;
        backend.close().await?;

        let topic_out = format!("{prefix}/{client_id}/file/new");
        self.client
            .publish(&topic_out, &serde_json::json!({"path": full_path}).to_string(), false)
            .await
            .ok();
        info!(path = %full_path, "file saved");

        if let Err(e) = self.publisher.publish(DomainEvent::file_saved(device.id, full_path)).await {
            error!("failed to publish file_saved audit log: {e}");
        }

        Ok(())
    }

    /// Independent 5 s timer publishing a heartbeat log for every enabled
    /// device, regardless of storage activity.
    pub async fn run_heartbeat(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            ticker.tick().await;
            let devices = match self.devices.find_enabled().await {
                Ok(devices) => devices,
                Err(e) => {
                    error!("failed to list enabled devices for heartbeat: {e}");
                    continue;
                }
            };
            for device in devices {
                if let Err(e) = self.publisher.publish(DomainEvent::heartbeat(device.id)).await {
                    error!("failed to publish heartbeat: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_relevant_requires_create_suffix_and_file_segment() {
        assert!(StorageManager::is_relevant("storage/cam-1/file/create"));
        assert!(!StorageManager::is_relevant("storage/cam-1/file/created"));
        assert!(!StorageManager::is_relevant("storage/cam-1/other/create"));
    }

    #[test]
    fn build_relpath_classifies_by_extension() {
        assert_eq!(build_relpath("jpg", None), "images");
        assert_eq!(build_relpath("PDF", None), "pdfs");
        assert_eq!(build_relpath("bin", None), "others");
    }

    #[test]
    fn build_relpath_appends_caller_subdirectory() {
        assert_eq!(build_relpath("jpg", Some("/2026/07/")), "images/2026/07");
        assert_eq!(build_relpath("jpg", Some("")), "images");
    }
}
