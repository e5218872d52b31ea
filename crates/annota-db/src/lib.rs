//! # annota-db
//!
//! PostgreSQL storage layer for annota.
//!
//! This crate provides:
//! - Connection pool management
//! - The note repository: validated create/update, revert and copy
//! - The append-only version ledger
//! - Bulk undo of one actor's edits
//! - Composite note search with PostgreSQL tsvector
//!
//! ## Example
//!
//! ```rust,ignore
//! use annota_db::{Actor, Database, NoteDraft, NoteRepository, Rect};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/annota").await?;
//!     let actor = Actor::new(user_id, "203.0.113.7");
//!
//!     let note = db
//!         .notes
//!         .create(NoteDraft::new(post_id, Rect::new(10, 10, 40, 20), "Hello"), &actor)
//!         .await?;
//!
//!     println!("Created note {} at version {}", note.id, note.version);
//!     Ok(())
//! }
//! ```

pub mod actors;
pub mod images;
pub mod notes;
pub mod pool;
pub mod search;
pub mod undo;
pub mod versioning;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use chrono::{DateTime, SubsecRound, Utc};

// Re-export core types
pub use annota_core::*;

// Re-export repository implementations
pub use actors::{ActorProfile, PgActorGateway};
pub use images::PgImageGateway;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use search::{NoteSearchQueryBuilder, PgNoteSearch, QueryParam};
pub use undo::PgUndoCoordinator;
pub use versioning::VersionLedger;

/// Current time at the precision PostgreSQL stores (microseconds), so values
/// written and read back compare equal.
pub fn db_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note repository for validated writes, revert and copy.
    pub notes: PgNoteRepository,
    /// Note version history.
    pub versions: VersionLedger,
    /// Read access to posts and their annotation timestamp.
    pub images: PgImageGateway,
    /// Actor lookups.
    pub actors: PgActorGateway,
    /// Bulk undo by actor.
    pub undo: PgUndoCoordinator,
    /// Composite note search.
    pub search: PgNoteSearch,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            versions: VersionLedger::new(pool.clone()),
            images: PgImageGateway::new(pool.clone()),
            actors: PgActorGateway::new(pool.clone()),
            undo: PgUndoCoordinator::new(pool.clone()),
            search: PgNoteSearch::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
