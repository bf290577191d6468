use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cameras")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub device_id: i64,
    pub snapshot_url: Option<String>,
    pub default_stream_id: Option<i64>,
    pub status: String,
    pub last_heartbeat: Option<DateTimeWithTimeZone>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::devices::Entity",
        from = "Column::DeviceId",
        to = "super::devices::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Device,
    #[sea_orm(has_many = "super::camera_streams::Entity")]
    CameraStreams,
}

impl Related<super::devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl Related<super::camera_streams::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CameraStreams.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
