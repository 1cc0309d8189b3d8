//! REST API for notes owned by users, backed by SQLite, plus a rate limiter
//! for login endpoints.

use std::sync::Arc;

use sqlx::SqlitePool;

pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod repository;
pub mod route;
pub mod schema;
pub mod service;

use middleware::LoginLimiter;
use repository::{SqliteNoteRepository, SqliteUserRepository};
use service::NotesService;

// Struct representing the application state
pub struct AppState {
    pub notes: NotesService,
    pub login_limiter: LoginLimiter,
}

impl AppState {
    pub fn new(notes: NotesService, login_limiter: LoginLimiter) -> Arc<Self> {
        Arc::new(Self {
            notes,
            login_limiter,
        })
    }

    /// State wired to SQLite repositories sharing `pool`.
    pub fn sqlite(pool: SqlitePool, login_limiter: LoginLimiter) -> Arc<Self> {
        Self::new(
            NotesService::new(
                Arc::new(SqliteNoteRepository::new(pool.clone())),
                Arc::new(SqliteUserRepository::new(pool)),
            ),
            login_limiter,
        )
    }
}
