//! Access to the post (image) rows notes are drawn on.
//!
//! Posts are owned by the host application. The note engine reads their
//! dimensions and lock flag and maintains a single derived column,
//! `last_noted_at`.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use annota_core::{Error, ImageFacts, Result};

/// Gateway over the `post` table.
#[derive(Clone)]
pub struct PgImageGateway {
    pool: PgPool,
}

impl PgImageGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a post's dimensions and lock state.
    pub async fn get(&self, post_id: Uuid) -> Result<Option<ImageFacts>> {
        sqlx::query_as::<_, ImageFacts>(
            "SELECT id, image_width, image_height, is_note_locked, last_noted_at
             FROM post WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)
    }

    /// Check if a post exists.
    pub async fn exists(&self, post_id: Uuid) -> Result<bool> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM post WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.0)
    }
}

/// Transaction-aware variants used inside note writes.
impl PgImageGateway {
    /// Fetch a post and row-lock it until the transaction ends.
    ///
    /// Note writes go on to update `last_noted_at` on the same row, so the
    /// lock is taken at update strength, never upgraded.
    pub async fn get_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
    ) -> Result<Option<ImageFacts>> {
        sqlx::query_as::<_, ImageFacts>(
            "SELECT id, image_width, image_height, is_note_locked, last_noted_at
             FROM post WHERE id = $1
             FOR NO KEY UPDATE",
        )
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)
    }

    /// Whether any active note is attached to the post.
    pub async fn has_active_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
    ) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM note WHERE post_id = $1 AND is_active = TRUE)",
        )
        .bind(post_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(row.0)
    }

    pub async fn set_last_noted_at_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query("UPDATE post SET last_noted_at = $1 WHERE id = $2")
            .bind(at)
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Recompute `last_noted_at` after a note on the post was written at
    /// `written_at`: that time if the post still has an active note,
    /// otherwise NULL.
    pub async fn refresh_last_noted_at_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        written_at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let at = if self.has_active_note_tx(tx, post_id).await? {
            Some(written_at)
        } else {
            None
        };
        self.set_last_noted_at_tx(tx, post_id, at).await?;
        Ok(at)
    }

    /// Recompute `last_noted_at` from the notes still on the post: the latest
    /// `updated_at` among its active notes, or NULL when none is active.
    pub async fn recompute_last_noted_at_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>> {
        let row: (Option<DateTime<Utc>>,) = sqlx::query_as(
            "SELECT MAX(updated_at) FROM note WHERE post_id = $1 AND is_active = TRUE",
        )
        .bind(post_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;
        self.set_last_noted_at_tx(tx, post_id, row.0).await?;
        Ok(row.0)
    }
}
