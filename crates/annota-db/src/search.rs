//! Composite note search.
//!
//! [`NoteSearchQueryBuilder`] turns [`NoteSearchParams`] into a parameterized
//! WHERE clause over `note n`; [`PgNoteSearch`] runs it. Every filter is a
//! named method so callers can compose their own queries too.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, field, info_span, Instrument};
use uuid::Uuid;

use annota_core::logging::{DURATION_MS, FILTER_COUNT, RESULT_COUNT};
use annota_core::{
    escape_for_sql_like, is_wildcard_query, tsquery_conjunction, Actor, Error, Note,
    NoteSearchParams, NoteSearchRepository, Result,
};

use crate::actors::PgActorGateway;
use crate::notes::NOTE_COLUMNS;

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// Single UUID parameter.
    Uuid(Uuid),
    /// Boolean parameter.
    Bool(bool),
    /// String parameter.
    String(String),
    /// Row count parameter.
    BigInt(i64),
}

/// Builds the WHERE clause for a note search.
///
/// # Example
///
/// ```rust,ignore
/// use annota_db::search::NoteSearchQueryBuilder;
///
/// let (sql, params) = NoteSearchQueryBuilder::new(0)
///     .active()
///     .post_id(post_id)
///     .build();
/// // sql: "n.is_active = $1 AND n.post_id = $2"
/// ```
#[derive(Debug, Clone, Default)]
pub struct NoteSearchQueryBuilder {
    clauses: Vec<String>,
    params: Vec<QueryParam>,
    param_offset: usize,
}

impl NoteSearchQueryBuilder {
    /// Create an empty builder. `param_offset` is the number of parameters
    /// already bound ahead of this clause.
    pub fn new(param_offset: usize) -> Self {
        Self {
            clauses: Vec::new(),
            params: Vec::new(),
            param_offset,
        }
    }

    fn push(mut self, clause: impl FnOnce(usize) -> String, param: QueryParam) -> Self {
        let idx = self.param_offset + self.params.len() + 1;
        self.clauses.push(clause(idx));
        self.params.push(param);
        self
    }

    /// Only active notes.
    pub fn active(self) -> Self {
        self.is_active(true)
    }

    pub fn is_active(self, active: bool) -> Self {
        self.push(|i| format!("n.is_active = ${}", i), QueryParam::Bool(active))
    }

    /// Match the note body.
    ///
    /// A query containing `*` is a case-insensitive pattern when `actor` is
    /// privileged. Everything else is an English full-text match against the
    /// body index.
    pub fn body_matches(self, query: &str, actor: &Actor) -> Self {
        if is_wildcard_query(query) && actor.is_privileged {
            self.push(
                |i| format!("n.body ILIKE ${} ESCAPE '\\'", i),
                QueryParam::String(escape_for_sql_like(query)),
            )
        } else {
            self.push(
                |i| format!("n.body_index @@ plainto_tsquery('english', ${})", i),
                QueryParam::String(query.to_string()),
            )
        }
    }

    pub fn post_id(self, post_id: Uuid) -> Self {
        self.push(|i| format!("n.post_id = ${}", i), QueryParam::Uuid(post_id))
    }

    /// Notes on posts carrying every tag in `tags` (whitespace separated).
    pub fn post_tags_match(self, tags: &str) -> Self {
        match tsquery_conjunction(tags) {
            Some(tsquery) => self.push(
                |i| {
                    format!(
                        "EXISTS (SELECT 1 FROM post p WHERE p.id = n.post_id \
                         AND p.tag_index @@ to_tsquery('simple', ${}))",
                        i
                    )
                },
                QueryParam::String(tsquery),
            ),
            None => self,
        }
    }

    pub fn creator_id(self, creator_id: Uuid) -> Self {
        self.push(
            |i| format!("n.creator_id = ${}", i),
            QueryParam::Uuid(creator_id),
        )
    }

    /// Apply every present parameter. `resolved_creator` is the ID the
    /// caller looked up for `params.creator_name`.
    pub fn composite(
        self,
        params: &NoteSearchParams,
        actor: &Actor,
        resolved_creator: Option<Uuid>,
    ) -> Self {
        let mut builder = self;
        if let Some(query) = params.body_matches() {
            builder = builder.body_matches(query, actor);
        }
        if let Some(post_id) = params.post_id {
            builder = builder.post_id(post_id);
        }
        if let Some(tags) = params.post_tags_match() {
            builder = builder.post_tags_match(tags);
        }
        if let Some(creator_id) = resolved_creator {
            builder = builder.creator_id(creator_id);
        }
        if let Some(creator_id) = params.creator_id {
            builder = builder.creator_id(creator_id);
        }
        if let Some(active) = params.is_active {
            builder = builder.is_active(active);
        }
        builder
    }

    /// Number of filters applied so far.
    pub fn filter_count(&self) -> usize {
        self.clauses.len()
    }

    /// Build the WHERE clause fragment and its parameters in binding order.
    ///
    /// An empty builder yields `("TRUE", [])`.
    pub fn build(self) -> (String, Vec<QueryParam>) {
        if self.clauses.is_empty() {
            return ("TRUE".to_string(), Vec::new());
        }
        (self.clauses.join(" AND "), self.params)
    }
}

fn qualified_note_columns(alias: &str) -> String {
    NOTE_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// PostgreSQL implementation of NoteSearchRepository.
#[derive(Clone)]
pub struct PgNoteSearch {
    pool: PgPool,
    actors: PgActorGateway,
}

impl PgNoteSearch {
    pub fn new(pool: PgPool) -> Self {
        Self {
            actors: PgActorGateway::new(pool.clone()),
            pool,
        }
    }

    async fn run(&self, params: &NoteSearchParams, actor: &Actor) -> Result<Vec<Note>> {
        if let Some(limit) = params.limit {
            if limit <= 0 {
                return Err(Error::InvalidInput(format!(
                    "limit must be positive, got {}",
                    limit
                )));
            }
        }

        let resolved_creator = match params.creator_name() {
            Some(name) => match self.actors.resolve_id_by_name(&name).await? {
                Some(id) => Some(id),
                None => {
                    debug!(creator_name = %name, "Unknown creator name, no notes match");
                    tracing::Span::current().record(RESULT_COUNT, 0);
                    return Ok(Vec::new());
                }
            },
            None => None,
        };

        let builder = NoteSearchQueryBuilder::new(0).composite(params, actor, resolved_creator);
        tracing::Span::current().record(FILTER_COUNT, builder.filter_count());
        let (where_clause, mut binds) = builder.build();

        let mut sql = format!(
            "SELECT {} FROM note n WHERE {} ORDER BY n.created_at DESC, n.id DESC",
            qualified_note_columns("n"),
            where_clause
        );
        if let Some(limit) = params.limit {
            binds.push(QueryParam::BigInt(limit));
            sql.push_str(&format!(" LIMIT ${}", binds.len()));
        }

        let mut q = sqlx::query_as::<_, Note>(&sql);
        for param in binds {
            q = match param {
                QueryParam::Uuid(id) => q.bind(id),
                QueryParam::Bool(b) => q.bind(b),
                QueryParam::String(s) => q.bind(s),
                QueryParam::BigInt(n) => q.bind(n),
            };
        }

        let notes = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        tracing::Span::current().record(RESULT_COUNT, notes.len());
        Ok(notes)
    }
}

#[async_trait]
impl NoteSearchRepository for PgNoteSearch {
    async fn search(&self, params: &NoteSearchParams, actor: &Actor) -> Result<Vec<Note>> {
        let span = info_span!(
            "note_search",
            subsystem = "db",
            component = "search",
            actor_id = %actor.id,
            filter_count = field::Empty,
            result_count = field::Empty,
            duration_ms = field::Empty,
        );
        async move {
            let start = Instant::now();
            let result = self.run(params, actor).await;
            tracing::Span::current().record(DURATION_MS, start.elapsed().as_millis() as u64);
            debug!("Note search finished");
            result
        }
        .instrument(span)
        .await
    }
}
