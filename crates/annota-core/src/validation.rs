//! Ordered validation of a note candidate before it is persisted.
//!
//! Each [`ValidationStep`] inspects the candidate (and the owning image, when
//! one was found) independently and reports field-scoped errors. All steps
//! always run so that a caller sees every violation at once; the write
//! proceeds only if the combined list is empty.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{self, Rect};
use crate::models::{ImageFacts, NoteCandidate};

/// A single field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Every failure collected from one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Messages reported against `field`.
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Whether `field` has exactly this message.
    pub fn contains(&self, field: &str, message: &str) -> bool {
        self.0
            .iter()
            .any(|e| e.field == field && e.message == message)
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = FieldError>) {
        self.0.extend(errors);
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub const MSG_BLANK: &str = "can't be blank";
pub const MSG_POST_MISSING: &str = "must exist";
pub const MSG_POST_LOCKED: &str = "is note locked";
pub const MSG_OUT_OF_BOUNDS: &str = "must be inside the image";
pub const MSG_NO_DIMENSIONS: &str = "has no dimensions";

/// Named validation steps, run in [`ValidationStep::ORDERED`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStep {
    RequiredFields,
    ImageExists,
    ImageNotLocked,
    Geometry,
}

impl ValidationStep {
    pub const ORDERED: [ValidationStep; 4] = [
        ValidationStep::RequiredFields,
        ValidationStep::ImageExists,
        ValidationStep::ImageNotLocked,
        ValidationStep::Geometry,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValidationStep::RequiredFields => "required_fields",
            ValidationStep::ImageExists => "image_exists",
            ValidationStep::ImageNotLocked => "image_not_locked",
            ValidationStep::Geometry => "geometry",
        }
    }

    /// Run this step. `image` is the post referenced by the candidate, or
    /// `None` if it does not exist.
    pub fn check(&self, candidate: &NoteCandidate, image: Option<&ImageFacts>) -> Vec<FieldError> {
        match self {
            ValidationStep::RequiredFields => {
                let present = [
                    ("post_id", candidate.post_id.is_some()),
                    ("creator_id", candidate.creator_id.is_some()),
                    ("updater_id", candidate.updater_id.is_some()),
                    ("x", candidate.x.is_some()),
                    ("y", candidate.y.is_some()),
                    ("width", candidate.width.is_some()),
                    ("height", candidate.height.is_some()),
                ];
                present
                    .into_iter()
                    .filter(|(_, ok)| !ok)
                    .map(|(field, _)| FieldError::new(field, MSG_BLANK))
                    .collect()
            }
            ValidationStep::ImageExists => {
                if image.is_none() {
                    vec![FieldError::new("post", MSG_POST_MISSING)]
                } else {
                    Vec::new()
                }
            }
            ValidationStep::ImageNotLocked => match image {
                Some(img) if img.is_note_locked => {
                    vec![FieldError::new("post", MSG_POST_LOCKED)]
                }
                _ => Vec::new(),
            },
            // Without an image or a complete rectangle there is nothing to
            // measure; the other steps already report why.
            ValidationStep::Geometry => match (image, candidate.rect()) {
                (Some(img), Some(rect)) => {
                    match geometry::validate(rect, img.image_width, img.image_height) {
                        Ok(()) => Vec::new(),
                        Err(_) => vec![FieldError::new("note", MSG_OUT_OF_BOUNDS)],
                    }
                }
                _ => Vec::new(),
            },
        }
    }
}

/// A candidate that passed every step, with all required fields resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedNote {
    pub id: Option<Uuid>,
    pub post_id: Uuid,
    pub creator_id: Uuid,
    pub updater_id: Uuid,
    pub updater_ip_addr: String,
    pub rect: Rect,
    pub body: String,
    pub is_active: bool,
    pub version: i32,
}

/// Run every step in order and combine the results.
pub fn validate_candidate(
    candidate: &NoteCandidate,
    image: Option<&ImageFacts>,
) -> Result<ValidatedNote, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for step in ValidationStep::ORDERED {
        let found = step.check(candidate, image);
        if !found.is_empty() {
            tracing::debug!(
                step = step.name(),
                error_count = found.len(),
                "Validation step rejected candidate"
            );
        }
        errors.extend(found);
    }

    match (
        candidate.post_id,
        candidate.creator_id,
        candidate.updater_id,
        candidate.rect(),
    ) {
        (Some(post_id), Some(creator_id), Some(updater_id), Some(rect)) if errors.is_empty() => {
            Ok(ValidatedNote {
                id: candidate.id,
                post_id,
                creator_id,
                updater_id,
                updater_ip_addr: candidate.updater_ip_addr.clone(),
                rect,
                body: candidate.body.clone(),
                is_active: candidate.is_active,
                version: candidate.version,
            })
        }
        _ => Err(errors),
    }
}
