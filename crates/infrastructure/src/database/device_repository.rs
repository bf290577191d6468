use crate::database::entities::{device_models, devices};
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use domain::device::{
    Device, DeviceModel, DeviceModelRepository, DeviceRepository, DeviceStatus, TopicSchema,
};
use domain::DomainError;
use sea_orm::{ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

fn db_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::TransientIo(format!("database error: {e}"))
}

fn decode_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Configuration(format!("malformed row: {e}"))
}

fn model_to_device(model: devices::Model) -> Result<Device, DomainError> {
    let status: DeviceStatus =
        serde_json::from_value(serde_json::Value::String(model.status)).map_err(decode_err)?;
    let poll_interval_unit = serde_json::from_value(serde_json::Value::String(
        model.poll_interval_unit,
    ))
    .map_err(decode_err)?;

    Ok(Device {
        id: model.id,
        mqtt_client_id: model.mqtt_client_id,
        topic_prefix: model.topic_prefix,
        model_id: model.model_id,
        enabled: model.enabled,
        parameters: model.parameters,
        values: model.values,
        status,
        last_seen: model.last_seen.map(|dt| dt.with_timezone(&Utc)),
        poll_interval: model.poll_interval as u64,
        poll_interval_unit,
    })
}

fn model_to_device_model(model: device_models::Model) -> Result<DeviceModel, DomainError> {
    let topic_schema: TopicSchema = serde_json::from_value(model.topic_schema).map_err(decode_err)?;
    Ok(DeviceModel {
        id: model.id,
        name: model.name,
        topic_schema,
    })
}

pub struct SeaOrmDeviceRepository {
    db: DatabaseConnection,
}

impl SeaOrmDeviceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceRepository for SeaOrmDeviceRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Device>, DomainError> {
        let model = devices::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_device).transpose()
    }

    async fn find_by_client_id(&self, mqtt_client_id: &str) -> Result<Option<Device>, DomainError> {
        let model = devices::Entity::find()
            .filter(devices::Column::MqttClientId.eq(mqtt_client_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_device).transpose()
    }

    async fn find_enabled(&self) -> Result<Vec<Device>, DomainError> {
        let models = devices::Entity::find()
            .filter(devices::Column::Enabled.eq(true))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_device).collect()
    }

    async fn record_observation(
        &self,
        id: i64,
        values: serde_json::Value,
        status: DeviceStatus,
    ) -> Result<(), DomainError> {
        let now = Utc::now().with_timezone(&FixedOffset::east_opt(0).unwrap());
        let active = devices::ActiveModel {
            id: Set(id),
            values: Set(values),
            status: Set(status.as_str_value().to_string()),
            last_seen: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        };
        devices::Entity::update(active)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

pub struct SeaOrmDeviceModelRepository {
    db: DatabaseConnection,
}

impl SeaOrmDeviceModelRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceModelRepository for SeaOrmDeviceModelRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<DeviceModel>, DomainError> {
        let model = device_models::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_device_model).transpose()
    }
}

/// Helper used above — `DeviceStatus` derives `Serialize` as a bare lowercase
/// string, but exposing that string outside serde requires round-tripping
/// through `serde_json::Value`.
trait DeviceStatusExt {
    fn as_str_value(&self) -> &'static str;
}

impl DeviceStatusExt for DeviceStatus {
    fn as_str_value(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Error => "error",
        }
    }
}
