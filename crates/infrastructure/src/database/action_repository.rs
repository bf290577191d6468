use crate::database::entities::actions;
use async_trait::async_trait;
use domain::action::{Action, ActionChain, ActionRepository};
use domain::DomainError;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

fn db_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::TransientIo(format!("database error: {e}"))
}

fn decode_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Configuration(format!("malformed Action row: {e}"))
}

fn model_to_action(model: actions::Model) -> Result<Action, DomainError> {
    let chain: ActionChain = serde_json::from_value(model.chain).map_err(decode_err)?;
    Ok(Action {
        id: model.id,
        name: model.name,
        description: model.description,
        enabled: model.enabled,
        chain,
    })
}

pub struct SeaOrmActionRepository {
    db: DatabaseConnection,
}

impl SeaOrmActionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActionRepository for SeaOrmActionRepository {
    async fn find_enabled(&self) -> Result<Vec<Action>, DomainError> {
        let models = actions::Entity::find()
            .filter(actions::Column::Enabled.eq(true))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_action).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Action>, DomainError> {
        let model = actions::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_action).transpose()
    }
}
