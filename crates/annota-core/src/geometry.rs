//! Rectangle bounds checking and proportional rescaling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("rectangle {rect:?} is outside a {image_width}x{image_height} image")]
    OutOfBounds {
        rect: Rect,
        image_width: i32,
        image_height: i32,
    },
}

/// Check that `rect` lies entirely inside an image of the given size.
///
/// Edges may touch the image border: `x + width == image_width` is valid.
pub fn validate(rect: Rect, image_width: i32, image_height: i32) -> Result<(), GeometryError> {
    let right = i64::from(rect.x) + i64::from(rect.width);
    let bottom = i64::from(rect.y) + i64::from(rect.height);

    let inside = rect.x >= 0
        && rect.y >= 0
        && rect.width >= 0
        && rect.height >= 0
        && right <= i64::from(image_width)
        && bottom <= i64::from(image_height);

    if inside {
        Ok(())
    } else {
        Err(GeometryError::OutOfBounds {
            rect,
            image_width,
            image_height,
        })
    }
}

/// Scale `rect` from a `from` sized image onto a `to` sized image.
///
/// Each coordinate is multiplied by the real-valued ratio of the matching
/// dimension and rounded half away from zero. Returns `None` when the source
/// image has a zero dimension. The result is not clamped; callers must still
/// validate it against the target image.
pub fn rescale_rect(rect: Rect, from: (i32, i32), to: (i32, i32)) -> Option<Rect> {
    let (from_w, from_h) = from;
    let (to_w, to_h) = to;
    if from_w == 0 || from_h == 0 {
        return None;
    }

    let width_ratio = f64::from(to_w) / f64::from(from_w);
    let height_ratio = f64::from(to_h) / f64::from(from_h);
    let scale = |v: i32, ratio: f64| (f64::from(v) * ratio).round() as i32;

    Some(Rect {
        x: scale(rect.x, width_ratio),
        y: scale(rect.y, height_ratio),
        width: scale(rect.width, width_ratio),
        height: scale(rect.height, height_ratio),
    })
}
