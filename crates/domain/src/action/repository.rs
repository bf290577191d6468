use super::action::Action;
use crate::DomainError;
use async_trait::async_trait;

/// Read-through view of persisted Actions. Create/update/delete happens
/// through the admin API; the core only loads the enabled set and reacts
/// to hot-reload notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionRepository: Send + Sync {
    async fn find_enabled(&self) -> Result<Vec<Action>, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Action>, DomainError>;
}
