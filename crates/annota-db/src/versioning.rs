//! Append-only note version ledger.
//!
//! Every successful note write ends with [`VersionLedger::append_tx`], which
//! bumps the note's version counter, counts the edit against the acting actor
//! and stores an immutable snapshot of the note. History is read oldest first:
//! `(created_at, id)` ascending is insertion order.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use annota_core::{new_v7, Actor, Error, Note, NoteVersion, Result};

use crate::actors::PgActorGateway;
use crate::db_now;

const VERSION_COLUMNS: &str = "id, note_id, post_id, updater_id, updater_ip_addr, \
     x, y, width, height, body, is_active, version, created_at";

/// Repository for note version history.
#[derive(Clone)]
pub struct VersionLedger {
    pool: PgPool,
    actors: PgActorGateway,
}

impl VersionLedger {
    /// Create a new version ledger.
    pub fn new(pool: PgPool) -> Self {
        Self {
            actors: PgActorGateway::new(pool.clone()),
            pool,
        }
    }

    /// Version history of a note, oldest first.
    pub async fn list_for_note(&self, note_id: Uuid) -> Result<Vec<NoteVersion>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let versions = self.list_for_note_tx(&mut tx, note_id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(versions)
    }
}

/// Transaction-aware operations.
impl VersionLedger {
    /// Record a completed write to `note`.
    ///
    /// Bumps `note.version` by one (updating the passed value as well as the
    /// row), increments `actor`'s edit counter and inserts the snapshot. The
    /// snapshot carries the post-increment version.
    pub async fn append_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note: &mut Note,
        actor: &Actor,
    ) -> Result<NoteVersion> {
        note.version = self.bump_version_unchecked_tx(tx, note.id).await?;
        self.actors.increment_edit_counter_tx(tx, actor.id).await?;

        let sql = format!(
            r#"
            INSERT INTO note_version ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            VERSION_COLUMNS, VERSION_COLUMNS
        );
        let version = sqlx::query_as::<_, NoteVersion>(&sql)
            .bind(new_v7())
            .bind(note.id)
            .bind(note.post_id)
            .bind(note.updater_id)
            .bind(&note.updater_ip_addr)
            .bind(note.x)
            .bind(note.y)
            .bind(note.width)
            .bind(note.height)
            .bind(&note.body)
            .bind(note.is_active)
            .bind(note.version)
            .bind(db_now())
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "versioning",
            op = "append",
            note_id = %note.id,
            version = note.version,
            actor_id = %actor.id,
            "Version appended"
        );
        Ok(version)
    }

    /// Increment the stored version counter and return the new value.
    ///
    /// Writes the column directly. It deliberately skips validation and does
    /// not append a version: it is the ledger's own bookkeeping, and routing it
    /// through the note update path would record the write twice.
    async fn bump_version_unchecked_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
    ) -> Result<i32> {
        let row: Option<(i32,)> =
            sqlx::query_as("UPDATE note SET version = version + 1 WHERE id = $1 RETURNING version")
                .bind(note_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(Error::Database)?;
        row.map(|r| r.0).ok_or(Error::NoteNotFound(note_id))
    }

    /// Version history of a note, oldest first.
    pub async fn list_for_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
    ) -> Result<Vec<NoteVersion>> {
        let sql = format!(
            "SELECT {} FROM note_version WHERE note_id = $1 ORDER BY created_at ASC, id ASC",
            VERSION_COLUMNS
        );
        sqlx::query_as::<_, NoteVersion>(&sql)
            .bind(note_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    /// The oldest surviving version of a note.
    pub async fn earliest_for_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
    ) -> Result<Option<NoteVersion>> {
        let sql = format!(
            "SELECT {} FROM note_version WHERE note_id = $1 ORDER BY created_at ASC, id ASC LIMIT 1",
            VERSION_COLUMNS
        );
        sqlx::query_as::<_, NoteVersion>(&sql)
            .bind(note_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    /// A version by ID, only if it belongs to `note_id`.
    pub async fn get_for_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        version_id: Uuid,
    ) -> Result<Option<NoteVersion>> {
        let sql = format!(
            "SELECT {} FROM note_version WHERE id = $1 AND note_id = $2",
            VERSION_COLUMNS
        );
        sqlx::query_as::<_, NoteVersion>(&sql)
            .bind(version_id)
            .bind(note_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    /// Delete every version written by `actor_id`.
    ///
    /// Returns the `note_id` of each deleted row, one entry per version, so
    /// the caller works from exactly the set this statement removed.
    pub async fn delete_by_updater_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("DELETE FROM note_version WHERE updater_id = $1 RETURNING note_id")
                .bind(actor_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(Error::Database)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
