//! Core traits for annota.
//!
//! These traits define the operations the engine exposes to callers (an API
//! layer, the operator CLI). `annota-db` provides the PostgreSQL
//! implementations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Actor, Note, NoteDraft, NotePatch, NoteVersion, UndoReport};
use crate::search::NoteSearchParams;

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Note lifecycle: validated writes, history, revert and copy.
///
/// Every mutating method runs in its own transaction and appends exactly one
/// version on success. Validation failures are returned as
/// [`Error::Validation`](crate::Error::Validation) with every violated field.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Create a note authored by `actor`.
    async fn create(&self, draft: NoteDraft, actor: &Actor) -> Result<Note>;

    /// Apply `patch` to an existing note on behalf of `actor`.
    async fn update(&self, note_id: Uuid, patch: NotePatch, actor: &Actor) -> Result<Note>;

    /// Fetch a note by ID.
    async fn fetch(&self, note_id: Uuid) -> Result<Note>;

    /// Check if a note exists.
    async fn exists(&self, note_id: Uuid) -> Result<bool>;

    /// Version history of a note, oldest first.
    async fn list_versions(&self, note_id: Uuid) -> Result<Vec<NoteVersion>>;

    /// Restore a note's mutable fields from one of its versions.
    async fn revert_to(&self, note_id: Uuid, version_id: Uuid, actor: &Actor) -> Result<Note>;

    /// Like [`revert_to`](Self::revert_to), but a validation failure becomes
    /// [`Error::RevertFailed`](crate::Error::RevertFailed).
    async fn revert_to_strict(
        &self,
        note_id: Uuid,
        version_id: Uuid,
        actor: &Actor,
    ) -> Result<Note>;

    /// Copy a note onto another post, rescaling its rectangle.
    async fn copy_to(&self, note_id: Uuid, target_post_id: Uuid, actor: &Actor) -> Result<Note>;
}

/// Bulk reversal of one actor's edits.
#[async_trait]
pub trait UndoRepository: Send + Sync {
    /// Delete every version written by `target_actor_id` and revert each
    /// affected note to its earliest remaining version, all or nothing.
    /// Reverts are stamped with `acting`.
    async fn undo_all_by_actor(&self, target_actor_id: Uuid, acting: &Actor)
        -> Result<UndoReport>;
}

/// Composite note search.
#[async_trait]
pub trait NoteSearchRepository: Send + Sync {
    /// Notes matching every present parameter, newest first.
    async fn search(&self, params: &NoteSearchParams, actor: &Actor) -> Result<Vec<Note>>;
}
