//! Note repository implementation.
//!
//! Every write follows the same path inside one transaction: build a
//! candidate, run the ordered validation steps against the owning post,
//! persist the note row, append a version through the [`VersionLedger`] and
//! refresh the post's `last_noted_at`. A rejected candidate returns before
//! anything is written.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use annota_core::{
    new_v7, plan_copy, validate_candidate, Actor, Error, ImageFacts, Note, NoteCandidate,
    NoteDraft, NotePatch, NoteRepository, NoteVersion, Result, ValidatedNote, ValidationErrors,
};

use crate::db_now;
use crate::images::PgImageGateway;
use crate::versioning::VersionLedger;

pub(crate) const NOTE_COLUMNS: &str = "id, post_id, creator_id, updater_id, updater_ip_addr, \
     x, y, width, height, body, is_active, version, created_at, updated_at";

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: PgPool,
    images: PgImageGateway,
    versions: VersionLedger,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            images: PgImageGateway::new(pool.clone()),
            versions: VersionLedger::new(pool.clone()),
            pool,
        }
    }

    fn reject(op: &'static str, note_id: Option<Uuid>, errors: ValidationErrors) -> Error {
        warn!(
            subsystem = "db",
            component = "notes",
            op,
            note_id = ?note_id,
            error_count = errors.len(),
            error = %errors,
            "Note write rejected by validation"
        );
        Error::Validation(errors)
    }

    /// Look up the candidate's post (row-locked) and validate against it.
    async fn validate_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        op: &'static str,
        candidate: &NoteCandidate,
    ) -> Result<ValidatedNote> {
        let image = match candidate.post_id {
            Some(post_id) => self.images.get_tx(tx, post_id).await?,
            None => None,
        };
        validate_candidate(candidate, image.as_ref())
            .map_err(|errors| Self::reject(op, candidate.id, errors))
    }
}

/// Transaction-aware operations.
///
/// These compose inside a caller's transaction; [`UndoCoordinator`] runs many
/// reverts in one.
///
/// [`UndoCoordinator`]: crate::undo::PgUndoCoordinator
impl PgNoteRepository {
    /// Fetch a note without locking it.
    pub async fn fetch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
    ) -> Result<Note> {
        let sql = format!("SELECT {} FROM note WHERE id = $1", NOTE_COLUMNS);
        sqlx::query_as::<_, Note>(&sql)
            .bind(note_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::NoteNotFound(note_id))
    }

    /// Fetch a note and hold its row lock until the transaction ends.
    pub async fn lock_tx(&self, tx: &mut Transaction<'_, Postgres>, note_id: Uuid) -> Result<Note> {
        let sql = format!("SELECT {} FROM note WHERE id = $1 FOR UPDATE", NOTE_COLUMNS);
        sqlx::query_as::<_, Note>(&sql)
            .bind(note_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::NoteNotFound(note_id))
    }

    /// Validate and insert a new note authored by `actor`.
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        draft: NoteDraft,
        actor: &Actor,
    ) -> Result<Note> {
        let candidate = NoteCandidate::for_create(draft, actor);
        let valid = self.validate_tx(tx, "create", &candidate).await?;

        let now = db_now();
        let sql = format!(
            r#"
            INSERT INTO note ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING {}
            "#,
            NOTE_COLUMNS, NOTE_COLUMNS
        );
        let mut note = sqlx::query_as::<_, Note>(&sql)
            .bind(new_v7())
            .bind(valid.post_id)
            .bind(valid.creator_id)
            .bind(valid.updater_id)
            .bind(&valid.updater_ip_addr)
            .bind(valid.rect.x)
            .bind(valid.rect.y)
            .bind(valid.rect.width)
            .bind(valid.rect.height)
            .bind(&valid.body)
            .bind(valid.is_active)
            .bind(valid.version)
            .bind(now)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?;

        self.versions.append_tx(tx, &mut note, actor).await?;
        self.images
            .refresh_last_noted_at_tx(tx, note.post_id, note.updated_at)
            .await?;
        Ok(note)
    }

    /// Lock, patch and validate an existing note.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        patch: NotePatch,
        actor: &Actor,
    ) -> Result<Note> {
        let current = self.lock_tx(tx, note_id).await?;
        self.apply_patch_tx(tx, "update", &current, patch, actor)
            .await
    }

    async fn apply_patch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        op: &'static str,
        current: &Note,
        patch: NotePatch,
        actor: &Actor,
    ) -> Result<Note> {
        let candidate = NoteCandidate::for_update(current, patch, actor);
        if let Some(target) = candidate.post_id.filter(|p| *p != current.post_id) {
            // Both posts get written; lock them in ID order.
            let (first, second) = if current.post_id < target {
                (current.post_id, target)
            } else {
                (target, current.post_id)
            };
            self.images.get_tx(tx, first).await?;
            self.images.get_tx(tx, second).await?;
        }
        let valid = self.validate_tx(tx, op, &candidate).await?;

        let sql = format!(
            r#"
            UPDATE note
            SET post_id = $2, updater_id = $3, updater_ip_addr = $4,
                x = $5, y = $6, width = $7, height = $8,
                body = $9, is_active = $10, updated_at = $11
            WHERE id = $1
            RETURNING {}
            "#,
            NOTE_COLUMNS
        );
        let mut note = sqlx::query_as::<_, Note>(&sql)
            .bind(current.id)
            .bind(valid.post_id)
            .bind(valid.updater_id)
            .bind(&valid.updater_ip_addr)
            .bind(valid.rect.x)
            .bind(valid.rect.y)
            .bind(valid.rect.width)
            .bind(valid.rect.height)
            .bind(&valid.body)
            .bind(valid.is_active)
            .bind(db_now())
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?;

        self.versions.append_tx(tx, &mut note, actor).await?;
        self.images
            .refresh_last_noted_at_tx(tx, note.post_id, note.updated_at)
            .await?;
        if current.post_id != note.post_id {
            self.images
                .recompute_last_noted_at_tx(tx, current.post_id)
                .await?;
        }
        Ok(note)
    }

    /// Restore the note's mutable fields from `version_id`, stamped with
    /// `actor`. The version must belong to the note.
    pub async fn revert_to_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        version_id: Uuid,
        actor: &Actor,
    ) -> Result<Note> {
        let current = self.lock_tx(tx, note_id).await?;
        let version = self
            .versions
            .get_for_note_tx(tx, note_id, version_id)
            .await?
            .ok_or(Error::VersionNotFound {
                note_id,
                version_id,
            })?;
        self.revert_locked_tx(tx, &current, &version, actor).await
    }

    /// Revert an already-locked note to `version`, turning a validation
    /// rejection into [`Error::RevertFailed`].
    pub async fn revert_locked_strict_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        current: &Note,
        version: &NoteVersion,
        actor: &Actor,
    ) -> Result<Note> {
        self.revert_locked_tx(tx, current, version, actor)
            .await
            .map_err(|e| strict(current.id, e))
    }

    async fn revert_locked_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        current: &Note,
        version: &NoteVersion,
        actor: &Actor,
    ) -> Result<Note> {
        self.apply_patch_tx(tx, "revert", current, NotePatch::from_version(version), actor)
            .await
    }

    /// Copy `note_id` onto `target_post_id`, rescaled, as a new note authored
    /// by `actor`.
    pub async fn copy_to_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        target_post_id: Uuid,
        actor: &Actor,
    ) -> Result<Note> {
        let source = self.fetch_tx(tx, note_id).await?;
        let source_image = self.require_image_tx(tx, source.post_id).await?;
        let target_image = self.require_image_tx(tx, target_post_id).await?;
        let draft = plan_copy(&source, &source_image, &target_image)
            .map_err(|errors| Self::reject("copy", Some(note_id), errors))?;
        self.create_tx(tx, draft, actor).await
    }

    async fn require_image_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
    ) -> Result<ImageFacts> {
        self.images
            .get_tx(tx, post_id)
            .await?
            .ok_or(Error::PostNotFound(post_id))
    }
}

fn strict(note_id: Uuid, error: Error) -> Error {
    match error {
        Error::Validation(errors) => Error::RevertFailed { note_id, errors },
        other => other,
    }
}

fn log_write(op: &'static str, note: &Note, actor: &Actor, start: Instant) {
    info!(
        subsystem = "db",
        component = "notes",
        op,
        note_id = %note.id,
        post_id = %note.post_id,
        actor_id = %actor.id,
        version = note.version,
        duration_ms = start.elapsed().as_millis() as u64,
        "Note written"
    );
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn create(&self, draft: NoteDraft, actor: &Actor) -> Result<Note> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self.create_tx(&mut tx, draft, actor).await?;
        tx.commit().await.map_err(Error::Database)?;
        log_write("create", &note, actor, start);
        Ok(note)
    }

    async fn update(&self, note_id: Uuid, patch: NotePatch, actor: &Actor) -> Result<Note> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self.update_tx(&mut tx, note_id, patch, actor).await?;
        tx.commit().await.map_err(Error::Database)?;
        log_write("update", &note, actor, start);
        Ok(note)
    }

    async fn fetch(&self, note_id: Uuid) -> Result<Note> {
        let sql = format!("SELECT {} FROM note WHERE id = $1", NOTE_COLUMNS);
        sqlx::query_as::<_, Note>(&sql)
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::NoteNotFound(note_id))
    }

    async fn exists(&self, note_id: Uuid) -> Result<bool> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM note WHERE id = $1)")
            .bind(note_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.0)
    }

    async fn list_versions(&self, note_id: Uuid) -> Result<Vec<NoteVersion>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.fetch_tx(&mut tx, note_id).await?;
        let versions = self.versions.list_for_note_tx(&mut tx, note_id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(versions)
    }

    async fn revert_to(&self, note_id: Uuid, version_id: Uuid, actor: &Actor) -> Result<Note> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self.revert_to_tx(&mut tx, note_id, version_id, actor).await?;
        tx.commit().await.map_err(Error::Database)?;
        log_write("revert", &note, actor, start);
        Ok(note)
    }

    async fn revert_to_strict(
        &self,
        note_id: Uuid,
        version_id: Uuid,
        actor: &Actor,
    ) -> Result<Note> {
        self.revert_to(note_id, version_id, actor)
            .await
            .map_err(|e| strict(note_id, e))
    }

    async fn copy_to(&self, note_id: Uuid, target_post_id: Uuid, actor: &Actor) -> Result<Note> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self
            .copy_to_tx(&mut tx, note_id, target_post_id, actor)
            .await?;
        tx.commit().await.map_err(Error::Database)?;
        log_write("copy", &note, actor, start);
        Ok(note)
    }
}
