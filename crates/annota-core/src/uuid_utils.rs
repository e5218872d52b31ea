//! UUID v7 utilities for time-ordered identifiers.
//!
//! Notes and versions use UUIDv7 so that ordering by ID follows insertion
//! order, which the version history relies on as a tiebreaker.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// # Example
///
/// ```
/// use annota_core::uuid_utils::new_v7;
///
/// let a = new_v7();
/// let b = new_v7();
/// assert!(b > a);
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
