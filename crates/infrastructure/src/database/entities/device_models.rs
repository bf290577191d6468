use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The `topic_schema` column holds a serialized `domain::device::TopicSchema`;
/// only the `topic` kind of schema matters to the core (`config`/`function`
/// schemas are consumed by the admin API, not read here).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_models")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub topic_schema: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::devices::Entity")]
    Devices,
}

impl Related<super::devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Devices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
