use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub mqtt_client_id: String,
    pub topic_prefix: String,
    pub model_id: i64,
    pub enabled: bool,
    pub parameters: Json,
    pub values: Json,
    pub status: String,
    pub last_seen: Option<DateTimeWithTimeZone>,
    pub poll_interval: i64,
    pub poll_interval_unit: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device_models::Entity",
        from = "Column::ModelId",
        to = "super::device_models::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    DeviceModel,
    #[sea_orm(has_one = "super::cameras::Entity")]
    Camera,
}

impl Related<super::device_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceModel.def()
    }
}

impl Related<super::cameras::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Camera.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
