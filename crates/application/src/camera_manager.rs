use crate::worker_pool::QueueItem;
use base64::Engine;
use domain::camera::{CameraRepository, ImageSource};
use domain::device::DeviceRepository;
use domain::{DeviceStatus, DomainEvent, EventPublisher};
use infrastructure::camera::{probe_rtsp_online, SnapshotFetcher};
use infrastructure::camera::pdf::to_single_page_pdf;
use infrastructure::MqttClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const LIVENESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fetches a still frame on `…/snapshot/exe` intent and polls per-device
/// camera liveness on a 1 s timer. Grounded on `controllers/
/// camera_handler.py`'s `CameraManager`.
pub struct CameraManager {
    client: MqttClient,
    devices: Arc<dyn DeviceRepository>,
    cameras: Arc<dyn CameraRepository>,
    fetcher: Arc<dyn SnapshotFetcher>,
    publisher: Arc<dyn EventPublisher>,
}

impl CameraManager {
    pub fn new(
        client: MqttClient,
        devices: Arc<dyn DeviceRepository>,
        cameras: Arc<dyn CameraRepository>,
        fetcher: Arc<dyn SnapshotFetcher>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Arc<Self> {
        Arc::new(Self { client, devices, cameras, fetcher, publisher })
    }

    pub fn is_relevant(topic: &str) -> bool {
        topic.ends_with("/snapshot/exe")
    }

    pub async fn process(self: &Arc<Self>, item: QueueItem) -> anyhow::Result<()> {
        let parts: Vec<&str> = item.topic.splitn(3, '/').collect();
        if parts.len() < 3 {
            return Ok(());
        }
        let (prefix, client_id) = (parts[0], parts[1]);
        let fmt = String::from_utf8_lossy(&item.payload).trim().to_lowercase();
        self.handle_snapshot(prefix, client_id, &fmt).await;
        Ok(())
    }

    async fn handle_snapshot(&self, prefix: &str, client_id: &str, fmt: &str) {
        let want_pdf = fmt == "pdf";

        let device = match self.devices.find_by_client_id(client_id).await {
            Ok(Some(d)) if d.topic_prefix == prefix => d,
            Ok(_) => {
                error!(prefix, client_id, "no device for snapshot request");
                return;
            }
            Err(e) => {
                error!("device lookup failed: {e}");
                return;
            }
        };

        let camera = match self.cameras.find_by_device_id(device.id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                error!(device_id = device.id, "no camera for device");
                return;
            }
            Err(e) => {
                error!("camera lookup failed: {e}");
                return;
            }
        };

        let streams = self.cameras.find_streams(camera.id).await.unwrap_or_default();
        let Some(source) = camera.resolve_source(&streams) else {
            self.log_failure(&device, "no image source available").await;
            return;
        };

        let jpeg = match self.fetcher.fetch(&source, &camera).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(camera_id = camera.id, "snapshot fetch failed: {e}");
                self.log_failure(&device, &e.to_string()).await;
                return;
            }
        };

        let (out, ext) = if want_pdf {
            match to_single_page_pdf(&jpeg) {
                Ok(pdf) => (pdf, "pdf"),
                Err(e) => {
                    error!(camera_id = camera.id, "pdf conversion failed: {e}");
                    self.log_failure(&device, &e.to_string()).await;
                    return;
                }
            }
        } else {
            (jpeg, "jpg")
        };

        let b64 = base64::engine::general_purpose::STANDARD.encode(&out);
        let topic_out = format!("{prefix}/{client_id}/snapshot");
        if let Err(e) = self
            .client
            .publish(&topic_out, &serde_json::json!({"ext": ext, "file": b64}).to_string(), false)
            .await
        {
            error!("failed to publish snapshot: {e}");
            return;
        }
        info!(topic_out, ext, "snapshot published");

        if let Err(e) = self
            .publisher
            .publish(DomainEvent::snapshot_captured(device.id, camera.id, ext))
            .await
        {
            error!("failed to publish snapshot audit log: {e}");
        }
    }

    async fn log_failure(&self, device: &domain::device::Device, reason: &str) {
        if let Err(e) = self.publisher.publish(DomainEvent::operation_failed(device.id, reason)).await {
            error!("failed to publish failure audit log: {e}");
        }
    }

    /// Independent 1 s timer: for every enabled device whose `last_seen`
    /// has fallen behind its poll interval, probes each of its cameras and
    /// persists the observed liveness.
    pub async fn run_liveness_poll(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(LIVENESS_POLL_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                warn!("liveness poll iteration failed: {e}");
            }
        }
    }

    async fn poll_once(&self) -> anyhow::Result<()> {
        let now = chrono::Utc::now();
        for device in self.devices.find_enabled().await? {
            let due = device
                .last_seen
                .map(|seen| (now - seen).num_milliseconds() as f64 / 1000.0 >= device.poll_interval_seconds())
                .unwrap_or(true);
            if !due {
                continue;
            }

            let Some(camera) = self.cameras.find_by_device_id(device.id).await? else {
                continue;
            };

            let online = if camera.snapshot_url.is_some() {
                true
            } else {
                let streams = self.cameras.find_streams(camera.id).await.unwrap_or_default();
                match camera.resolve_source(&streams) {
                    Some(ImageSource::Rtsp(url)) => probe_rtsp_online(&url).await,
                    _ => false,
                }
            };
            let status = if online { DeviceStatus::Online } else { DeviceStatus::Offline };

            self.cameras.record_heartbeat(camera.id, status, now).await?;
            self.devices.record_observation(device.id, device.values.clone(), status).await?;

            if let Err(e) = self.publisher.publish(DomainEvent::heartbeat(device.id)).await {
                error!("failed to publish heartbeat: {e}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_relevant_matches_only_snapshot_exe() {
        assert!(CameraManager::is_relevant("cameras/front-door/snapshot/exe"));
        assert!(!CameraManager::is_relevant("cameras/front-door/snapshot/result"));
        assert!(!CameraManager::is_relevant("cameras/front-door/online"));
    }
}
