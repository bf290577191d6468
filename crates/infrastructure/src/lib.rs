//! Infrastructure layer - External integrations

pub mod camera;
pub mod config;
pub mod database;
pub mod messaging;
pub mod storage;

pub use camera::{probe_rtsp_online, DefaultSnapshotFetcher, SnapshotFetcher};
pub use config::CoreConfig;
pub use database::{
    SeaOrmActionRepository, SeaOrmCameraRepository, SeaOrmDeviceModelRepository,
    SeaOrmDeviceRepository,
};
pub use messaging::composite_publisher::CompositeEventPublisher;
pub use messaging::mqtt_client::{MqttClient, MqttMessage};
pub use messaging::mqtt_publisher::MqttEventPublisher;
pub use storage::{open_backend, FtpBackend, LocalBackend, RemoteStorageParams, SftpBackend, StorageBackend};
