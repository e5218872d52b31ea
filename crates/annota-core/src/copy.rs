//! Planning a copy of a note onto another post.

use crate::geometry::rescale_rect;
use crate::models::{ImageFacts, Note, NoteDraft};
use crate::validation::{FieldError, ValidationErrors, MSG_NO_DIMENSIONS};

/// Build the draft for copying `source` (drawn on `source_image`) onto
/// `target`.
///
/// Geometry is scaled by the ratio of the two images' dimensions and the
/// version counter restarts at zero. Body and active state carry over; the
/// creator and updater are stamped by whoever persists the draft. The scaled
/// rectangle is not guaranteed to fit, so the draft must go through normal
/// create validation.
pub fn plan_copy(
    source: &Note,
    source_image: &ImageFacts,
    target: &ImageFacts,
) -> Result<NoteDraft, ValidationErrors> {
    let rect = rescale_rect(
        source.rect(),
        (source_image.image_width, source_image.image_height),
        (target.image_width, target.image_height),
    )
    .ok_or_else(|| ValidationErrors::from(vec![FieldError::new("post", MSG_NO_DIMENSIONS)]))?;

    Ok(NoteDraft {
        post_id: Some(target.id),
        x: Some(rect.x),
        y: Some(rect.y),
        width: Some(rect.width),
        height: Some(rect.height),
        body: Some(source.body.clone()),
        is_active: source.is_active,
        version: 0,
    })
}
