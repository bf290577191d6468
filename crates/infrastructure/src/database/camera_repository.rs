use crate::database::entities::{camera_streams, cameras};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use domain::camera::{Camera, CameraRepository, CameraStream, StreamKind};
use domain::device::DeviceStatus;
use domain::DomainError;
use sea_orm::{ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

fn db_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::TransientIo(format!("database error: {e}"))
}

fn decode_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Configuration(format!("malformed Camera row: {e}"))
}

fn model_to_camera(model: cameras::Model) -> Result<Camera, DomainError> {
    let status: DeviceStatus =
        serde_json::from_value(serde_json::Value::String(model.status)).map_err(decode_err)?;
    Ok(Camera {
        id: model.id,
        device_id: model.device_id,
        snapshot_url: model.snapshot_url,
        default_stream_id: model.default_stream_id,
        status,
        last_heartbeat: model.last_heartbeat.map(|dt| dt.with_timezone(&Utc)),
        username: model.username,
        password: model.password,
    })
}

fn model_to_stream(model: camera_streams::Model) -> Result<CameraStream, DomainError> {
    let kind: StreamKind =
        serde_json::from_value(serde_json::Value::String(model.kind)).map_err(decode_err)?;
    Ok(CameraStream {
        id: model.id,
        camera_id: model.camera_id,
        kind,
        url: model.url,
    })
}

pub struct SeaOrmCameraRepository {
    db: DatabaseConnection,
}

impl SeaOrmCameraRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CameraRepository for SeaOrmCameraRepository {
    async fn find_by_device_id(&self, device_id: i64) -> Result<Option<Camera>, DomainError> {
        let model = cameras::Entity::find()
            .filter(cameras::Column::DeviceId.eq(device_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_camera).transpose()
    }

    async fn find_streams(&self, camera_id: i64) -> Result<Vec<CameraStream>, DomainError> {
        let models = camera_streams::Entity::find()
            .filter(camera_streams::Column::CameraId.eq(camera_id))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_stream).collect()
    }

    async fn record_heartbeat(
        &self,
        camera_id: i64,
        status: DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let status_str = match status {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Error => "error",
        };
        let active = cameras::ActiveModel {
            id: Set(camera_id),
            status: Set(status_str.to_string()),
            last_heartbeat: Set(Some(at.with_timezone(&FixedOffset::east_opt(0).unwrap()))),
            ..Default::default()
        };
        cameras::Entity::update(active)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
