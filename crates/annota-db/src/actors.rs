//! Access to the actor (user) rows the engine reads and updates.

use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use annota_core::{Actor, Error, Result};

/// Stored actor profile.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ActorProfile {
    pub id: Uuid,
    pub name: String,
    pub is_privileged: bool,
    pub note_update_count: i32,
}

impl ActorProfile {
    /// The acting identity for a request made from `ip_addr`.
    pub fn acting_from(&self, ip_addr: impl Into<String>) -> Actor {
        Actor {
            id: self.id,
            ip_addr: ip_addr.into(),
            is_privileged: self.is_privileged,
        }
    }
}

/// Gateway over the `users` table.
#[derive(Clone)]
pub struct PgActorGateway {
    pool: PgPool,
}

impl PgActorGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch(&self, actor_id: Uuid) -> Result<Option<ActorProfile>> {
        sqlx::query_as::<_, ActorProfile>(
            "SELECT id, name, is_privileged, note_update_count FROM users WHERE id = $1",
        )
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)
    }

    /// Resolve a stored actor name (case-insensitive) to its ID.
    pub async fn resolve_id_by_name(&self, name: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT id FROM users WHERE lower(name) = lower($1) LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("id")))
    }

    /// Display name of an actor, with underscores shown as spaces.
    pub async fn display_name(&self, actor_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .fetch(actor_id)
            .await?
            .map(|p| annota_core::display_actor_name(&p.name)))
    }
}

/// Transaction-aware variants used inside note writes.
impl PgActorGateway {
    /// Count one more note edit for the actor.
    pub async fn increment_edit_counter_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor_id: Uuid,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET note_update_count = note_update_count + 1 WHERE id = $1")
            .bind(actor_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
