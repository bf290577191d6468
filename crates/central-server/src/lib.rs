pub mod api;
pub mod state;

use sea_orm::DatabaseConnection;
use state::AppState;
use std::sync::Arc;

pub fn setup_app_state(db: DatabaseConnection) -> Arc<AppState> {
    Arc::new(AppState::new(db))
}
