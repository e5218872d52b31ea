//! Bulk reversal of every edit one actor made to notes.

use std::collections::BTreeSet;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, field, info, info_span, trace, Instrument};
use uuid::Uuid;

use annota_core::logging::{NOTE_ID, VERSIONS_DELETED};
use annota_core::{Actor, Error, Result, UndoReport, UndoRepository};

use crate::notes::PgNoteRepository;
use crate::versioning::VersionLedger;

/// PostgreSQL implementation of UndoRepository.
#[derive(Clone)]
pub struct PgUndoCoordinator {
    pool: PgPool,
    notes: PgNoteRepository,
    versions: VersionLedger,
}

impl PgUndoCoordinator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            versions: VersionLedger::new(pool.clone()),
            pool,
        }
    }

    /// Undo inside the caller's transaction.
    ///
    /// The notes to revert are the ones the deletion itself reported, so an
    /// edit committed by the target actor mid-undo is either deleted and
    /// reverted or left whole. Those notes are row-locked in ID order. Any
    /// failure leaves the transaction unusable and the caller must drop it.
    pub async fn undo_all_by_actor_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        target_actor_id: Uuid,
        acting: &Actor,
    ) -> Result<UndoReport> {
        let deleted = self
            .versions
            .delete_by_updater_tx(tx, target_actor_id)
            .await?;
        let versions_deleted = deleted.len() as u64;
        tracing::Span::current().record(VERSIONS_DELETED, versions_deleted);

        let note_ids: BTreeSet<Uuid> = deleted.into_iter().collect();
        let mut locked = Vec::with_capacity(note_ids.len());
        for note_id in &note_ids {
            locked.push(self.notes.lock_tx(tx, *note_id).await?);
        }

        let mut report = UndoReport {
            actor_id: target_actor_id,
            versions_deleted,
            ..Default::default()
        };

        for note in &locked {
            match self.versions.earliest_for_note_tx(tx, note.id).await? {
                Some(version) => {
                    trace!(note_id = %note.id, version_id = %version.id, "Reverting note");
                    self.notes
                        .revert_locked_strict_tx(tx, note, &version, acting)
                        .await?;
                    report.notes_reverted.push(note.id);
                }
                None => {
                    trace!(note_id = %note.id, "No surviving version, leaving note as is");
                    report.notes_untouched.push(note.id);
                }
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl UndoRepository for PgUndoCoordinator {
    async fn undo_all_by_actor(
        &self,
        target_actor_id: Uuid,
        acting: &Actor,
    ) -> Result<UndoReport> {
        let span = info_span!(
            "undo_all_by_actor",
            subsystem = "db",
            component = "undo",
            target_actor_id = %target_actor_id,
            actor_id = %acting.id,
            versions_deleted = field::Empty,
            note_id = field::Empty,
        );

        async move {
            let start = Instant::now();
            let mut tx = self.pool.begin().await.map_err(Error::Database)?;

            let report = match self
                .undo_all_by_actor_tx(&mut tx, target_actor_id, acting)
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    if let Error::RevertFailed { note_id, .. } = &e {
                        tracing::Span::current().record(NOTE_ID, field::display(note_id));
                    }
                    error!(error = %e, "Undo rolled back");
                    // Dropping the transaction rolls it back.
                    return Err(e);
                }
            };

            tx.commit().await.map_err(Error::Database)?;

            info!(
                notes_reverted = report.notes_reverted.len(),
                notes_untouched = report.notes_untouched.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Undo complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}
