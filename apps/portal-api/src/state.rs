//! Shared state handed to every handler.

use portal_db::Database;

/// Application state cloned into each request.
///
/// `Database` is a handle over a pool, so cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}
