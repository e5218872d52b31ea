//! Note search parameters and query-text escaping.
//!
//! The database crate turns these into SQL predicates; this module only
//! decides what the parameters mean.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marks a body query as a pattern rather than a full-text query.
pub const WILDCARD: char = '*';

/// Parameters accepted by the composite note search.
///
/// Every field is optional. Absent or blank values add no filter, so the
/// default value matches every note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSearchParams {
    pub body_matches: Option<String>,
    pub post_id: Option<Uuid>,
    pub post_tags_match: Option<String>,
    pub creator_name: Option<String>,
    pub creator_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
}

impl NoteSearchParams {
    pub fn body_matches(&self) -> Option<&str> {
        present(&self.body_matches)
    }

    pub fn post_tags_match(&self) -> Option<&str> {
        present(&self.post_tags_match)
    }

    /// Creator name in stored form: spaces become underscores.
    pub fn creator_name(&self) -> Option<String> {
        present(&self.creator_name).map(|n| n.trim().replace(' ', "_"))
    }

    pub fn is_empty(&self) -> bool {
        self.body_matches().is_none()
            && self.post_id.is_none()
            && self.post_tags_match().is_none()
            && self.creator_name().is_none()
            && self.creator_id.is_none()
            && self.is_active.is_none()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Whether `query` asks for pattern matching.
pub fn is_wildcard_query(query: &str) -> bool {
    query.contains(WILDCARD)
}

/// Escape `query` for use with `LIKE ... ESCAPE '\'`, turning each `*` into
/// `%`.
pub fn escape_for_sql_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            WILDCARD => out.push('%'),
            other => out.push(other),
        }
    }
    out
}

/// Split `query` on whitespace into quoted `to_tsquery` lexemes joined with
/// `&`. Returns `None` when no terms remain.
pub fn tsquery_conjunction(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|term| format!("'{}'", term.replace('\\', "\\\\").replace('\'', "''")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" & "))
    }
}
