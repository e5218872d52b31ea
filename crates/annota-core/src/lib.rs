//! # annota-core
//!
//! Core types, traits, and rules for the annota annotation engine.
//!
//! This crate owns everything that does not need a database connection:
//! the note/version/image/actor models, geometry bounds checking, the ordered
//! validation pipeline, copy rescaling and revert planning, and the search
//! parameter types. The PostgreSQL implementation lives in `annota-db`.

pub mod copy;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod models;
pub mod search;
pub mod traits;
pub mod uuid_utils;
pub mod validation;

// Re-export commonly used types at crate root
pub use copy::plan_copy;
pub use error::{Error, Result};
pub use geometry::{rescale_rect, GeometryError, Rect};
pub use models::*;
pub use search::{
    escape_for_sql_like, is_wildcard_query, tsquery_conjunction, NoteSearchParams, WILDCARD,
};
pub use traits::*;
pub use uuid_utils::new_v7;
pub use validation::{
    validate_candidate, FieldError, ValidatedNote, ValidationErrors, ValidationStep,
};
