use super::entity::{Camera, CameraStream};
use crate::DomainError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read-through view of Cameras and their streams, plus the narrow write
/// path the liveness poller uses to persist `status`/`last_heartbeat`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CameraRepository: Send + Sync {
    async fn find_by_device_id(&self, device_id: i64) -> Result<Option<Camera>, DomainError>;
    async fn find_streams(&self, camera_id: i64) -> Result<Vec<CameraStream>, DomainError>;
    async fn record_heartbeat(
        &self,
        camera_id: i64,
        status: crate::device::DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
}
