use super::{Device, DeviceModel};
use crate::DomainError;
use async_trait::async_trait;

/// Read-through view of persisted devices. The core never writes through
/// this trait except to mirror ingress-observed state (`values`, `status`,
/// `last_seen`) — creation/deletion is owned by the admin API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Device>, DomainError>;
    async fn find_by_client_id(&self, mqtt_client_id: &str) -> Result<Option<Device>, DomainError>;
    async fn find_enabled(&self) -> Result<Vec<Device>, DomainError>;
    async fn record_observation(
        &self,
        id: i64,
        values: serde_json::Value,
        status: super::DeviceStatus,
    ) -> Result<(), DomainError>;
}

/// Read-through view of device models and their topic schemas.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceModelRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<DeviceModel>, DomainError>;
}
