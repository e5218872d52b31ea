//! Core data models for annota.
//!
//! Notes are rectangular annotations drawn on a post's image. Every write to a
//! note appends an immutable `NoteVersion` snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Rect;

/// Body stored in place of blank note text.
pub const EMPTY_BODY_PLACEHOLDER: &str = "(empty)";

/// Replace a blank body with [`EMPTY_BODY_PLACEHOLDER`].
pub fn normalize_body(body: Option<String>) -> String {
    match body {
        Some(b) if !b.trim().is_empty() => b,
        _ => EMPTY_BODY_PLACEHOLDER.to_string(),
    }
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Current state of a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub post_id: Uuid,
    pub creator_id: Uuid,
    pub updater_id: Uuid,
    pub updater_ip_addr: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub body: String,
    pub is_active: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Immutable snapshot of a note taken after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NoteVersion {
    pub id: Uuid,
    pub note_id: Uuid,
    pub post_id: Uuid,
    pub updater_id: Uuid,
    pub updater_ip_addr: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub body: String,
    pub is_active: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

impl NoteVersion {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Caller-supplied fields for a new note.
///
/// Geometry and post are optional here so that missing values surface as
/// field errors from validation rather than as type errors at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDraft {
    pub post_id: Option<Uuid>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub body: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Starting version counter; the ledger bumps it on persistence.
    #[serde(default)]
    pub version: i32,
}

fn default_true() -> bool {
    true
}

impl Default for NoteDraft {
    fn default() -> Self {
        Self {
            post_id: None,
            x: None,
            y: None,
            width: None,
            height: None,
            body: None,
            is_active: true,
            version: 0,
        }
    }
}

impl NoteDraft {
    /// Draft for a complete rectangle on `post_id`.
    pub fn new(post_id: Uuid, rect: Rect, body: impl Into<String>) -> Self {
        Self {
            post_id: Some(post_id),
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
            body: Some(body.into()),
            is_active: true,
            version: 0,
        }
    }
}

/// Partial update to an existing note. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotePatch {
    pub post_id: Option<Uuid>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub body: Option<String>,
    pub is_active: Option<bool>,
}

impl NotePatch {
    /// Patch restoring every mutable field recorded in `version`.
    pub fn from_version(version: &NoteVersion) -> Self {
        Self {
            post_id: Some(version.post_id),
            x: Some(version.x),
            y: Some(version.y),
            width: Some(version.width),
            height: Some(version.height),
            body: Some(version.body.clone()),
            is_active: Some(version.is_active),
        }
    }
}

/// A note's state just before validation: defaults applied, actor stamped,
/// nothing persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteCandidate {
    pub id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub creator_id: Option<Uuid>,
    pub updater_id: Option<Uuid>,
    pub updater_ip_addr: String,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub body: String,
    pub is_active: bool,
    pub version: i32,
}

impl NoteCandidate {
    /// Candidate for a new note authored by `actor`.
    pub fn for_create(draft: NoteDraft, actor: &Actor) -> Self {
        Self {
            id: None,
            post_id: draft.post_id,
            creator_id: Some(actor.id),
            updater_id: Some(actor.id),
            updater_ip_addr: actor.ip_addr.clone(),
            x: draft.x,
            y: draft.y,
            width: draft.width,
            height: draft.height,
            body: normalize_body(draft.body),
            is_active: draft.is_active,
            version: draft.version,
        }
    }

    /// Candidate for `note` with `patch` applied. The creator is kept and the
    /// updater is always restamped from `actor`.
    pub fn for_update(note: &Note, patch: NotePatch, actor: &Actor) -> Self {
        Self {
            id: Some(note.id),
            post_id: Some(patch.post_id.unwrap_or(note.post_id)),
            creator_id: Some(note.creator_id),
            updater_id: Some(actor.id),
            updater_ip_addr: actor.ip_addr.clone(),
            x: Some(patch.x.unwrap_or(note.x)),
            y: Some(patch.y.unwrap_or(note.y)),
            width: Some(patch.width.unwrap_or(note.width)),
            height: Some(patch.height.unwrap_or(note.height)),
            body: normalize_body(Some(patch.body.unwrap_or_else(|| note.body.clone()))),
            is_active: patch.is_active.unwrap_or(note.is_active),
            version: note.version,
        }
    }

    /// The rectangle, if every geometry field is present.
    pub fn rect(&self) -> Option<Rect> {
        Some(Rect::new(self.x?, self.y?, self.width?, self.height?))
    }
}

// =============================================================================
// EXTERNAL COLLABORATORS
// =============================================================================

/// The parts of a post (image) the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageFacts {
    pub id: Uuid,
    pub image_width: i32,
    pub image_height: i32,
    pub is_note_locked: bool,
    pub last_noted_at: Option<DateTime<Utc>>,
}

/// The identity performing a read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub ip_addr: String,
    /// Grants wildcard body search.
    pub is_privileged: bool,
}

impl Actor {
    pub fn new(id: Uuid, ip_addr: impl Into<String>) -> Self {
        Self {
            id,
            ip_addr: ip_addr.into(),
            is_privileged: false,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.is_privileged = true;
        self
    }
}

/// Actor names store spaces as underscores; render them back for display.
pub fn display_actor_name(stored: &str) -> String {
    stored.replace('_', " ")
}

/// Summary of a completed bulk undo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoReport {
    pub actor_id: Uuid,
    pub versions_deleted: u64,
    /// Notes reverted to their earliest surviving version.
    pub notes_reverted: Vec<Uuid>,
    /// Notes with no surviving version, left as they were.
    pub notes_untouched: Vec<Uuid>,
}
