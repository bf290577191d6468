use sea_orm::DatabaseConnection;

/// Shared handle for every admin-API route. The core binary (`edge-agent`)
/// never shares this state — it only ever reads through the `domain`
/// repository traits, never writes.
pub struct AppState {
    pub db: DatabaseConnection,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}
