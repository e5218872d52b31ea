//! Integration tests for bulk undo by actor.

use annota_db::test_fixtures::{seed_actor, seed_post, set_post_locked, TestDatabase};
use annota_db::{Error, NoteDraft, NotePatch, NoteRepository, Rect, UndoRepository};
use sqlx::PgPool;
use uuid::Uuid;

async fn versions_by(pool: &PgPool, actor_id: Uuid) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM note_version WHERE updater_id = $1")
        .bind(actor_id)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_undo_reverts_to_other_authors_version() {
    let t = TestDatabase::new().await;
    let post = seed_post(&t.pool, 100, 100, false, "").await;
    let author = seed_actor(&t.pool, false).await;
    let vandal = seed_actor(&t.pool, false).await;
    let moderator = seed_actor(&t.pool, true).await;

    let note = t
        .db
        .notes
        .create(NoteDraft::new(post, Rect::new(10, 10, 20, 20), "good"), &author)
        .await
        .unwrap();
    t.db.notes
        .update(
            note.id,
            NotePatch {
                x: Some(70),
                body: Some("bad".to_string()),
                ..Default::default()
            },
            &vandal,
        )
        .await
        .unwrap();

    let report = t
        .db
        .undo
        .undo_all_by_actor(vandal.id, &moderator)
        .await
        .unwrap();

    assert_eq!(report.actor_id, vandal.id);
    assert_eq!(report.versions_deleted, 1);
    assert_eq!(report.notes_reverted, vec![note.id]);
    assert!(report.notes_untouched.is_empty());

    let restored = t.db.notes.fetch(note.id).await.unwrap();
    assert_eq!(restored.body, "good");
    assert_eq!(restored.rect(), Rect::new(10, 10, 20, 20));
    assert_eq!(restored.updater_id, moderator.id);
    assert_eq!(versions_by(&t.pool, vandal.id).await, 0);

    // The author's version survives and the revert appended one more.
    let history = t.db.notes.list_versions(note.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].updater_id, author.id);
    assert_eq!(history[1].updater_id, moderator.id);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_undo_interleaved_history_keeps_other_authors_version() {
    let t = TestDatabase::new().await;
    let post = seed_post(&t.pool, 100, 100, false, "").await;
    let a = seed_actor(&t.pool, false).await;
    let b = seed_actor(&t.pool, false).await;
    let moderator = seed_actor(&t.pool, true).await;

    // v1 by A, v2 by B, v3 by A.
    let note = t
        .db
        .notes
        .create(NoteDraft::new(post, Rect::new(0, 0, 10, 10), "v1"), &a)
        .await
        .unwrap();
    let v2 = t
        .db
        .notes
        .update(
            note.id,
            NotePatch {
                y: Some(30),
                body: Some("v2".to_string()),
                ..Default::default()
            },
            &b,
        )
        .await
        .unwrap();
    t.db.notes
        .update(
            note.id,
            NotePatch {
                body: Some("v3".to_string()),
                ..Default::default()
            },
            &a,
        )
        .await
        .unwrap();

    let report = t
        .db
        .undo
        .undo_all_by_actor(a.id, &moderator)
        .await
        .unwrap();
    assert_eq!(report.versions_deleted, 2);
    assert_eq!(report.notes_reverted, vec![note.id]);

    let after = t.db.notes.fetch(note.id).await.unwrap();
    assert_eq!(after.body, "v2");
    assert_eq!(after.rect(), v2.rect());
    assert_eq!(versions_by(&t.pool, a.id).await, 0);
    assert_eq!(versions_by(&t.pool, b.id).await, 1);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_undo_of_sole_author_leaves_note_untouched() {
    let t = TestDatabase::new().await;
    let post = seed_post(&t.pool, 100, 100, false, "").await;
    let author = seed_actor(&t.pool, false).await;
    let moderator = seed_actor(&t.pool, true).await;

    let note = t
        .db
        .notes
        .create(NoteDraft::new(post, Rect::new(1, 2, 3, 4), "only"), &author)
        .await
        .unwrap();

    let report = t
        .db
        .undo
        .undo_all_by_actor(author.id, &moderator)
        .await
        .unwrap();

    assert_eq!(report.versions_deleted, 1);
    assert!(report.notes_reverted.is_empty());
    assert_eq!(report.notes_untouched, vec![note.id]);

    let after = t.db.notes.fetch(note.id).await.unwrap();
    assert_eq!(after, note);
    assert!(t.db.notes.list_versions(note.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_undo_rolls_back_when_a_revert_fails() {
    let t = TestDatabase::new().await;
    let post = seed_post(&t.pool, 100, 100, false, "").await;
    let author = seed_actor(&t.pool, false).await;
    let vandal = seed_actor(&t.pool, false).await;
    let moderator = seed_actor(&t.pool, true).await;

    let note = t
        .db
        .notes
        .create(NoteDraft::new(post, Rect::new(10, 10, 20, 20), "good"), &author)
        .await
        .unwrap();
    let vandalized = t
        .db
        .notes
        .update(
            note.id,
            NotePatch {
                body: Some("bad".to_string()),
                ..Default::default()
            },
            &vandal,
        )
        .await
        .unwrap();
    set_post_locked(&t.pool, post, true).await;

    let err = t
        .db
        .undo
        .undo_all_by_actor(vandal.id, &moderator)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RevertFailed { note_id, .. } if note_id == note.id));

    // Nothing was deleted or reverted.
    assert_eq!(versions_by(&t.pool, vandal.id).await, 1);
    assert_eq!(t.db.notes.fetch(note.id).await.unwrap(), vandalized);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_undo_for_actor_without_edits_is_empty() {
    let t = TestDatabase::new().await;
    let idle = seed_actor(&t.pool, false).await;
    let moderator = seed_actor(&t.pool, true).await;

    let report = t
        .db
        .undo
        .undo_all_by_actor(idle.id, &moderator)
        .await
        .unwrap();
    assert_eq!(report.versions_deleted, 0);
    assert!(report.notes_reverted.is_empty());
    assert!(report.notes_untouched.is_empty());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_undo_reverts_exactly_the_notes_it_deleted_from_in_id_order() {
    let t = TestDatabase::new().await;
    let post = seed_post(&t.pool, 100, 100, false, "").await;
    let author = seed_actor(&t.pool, false).await;
    let vandal = seed_actor(&t.pool, false).await;
    let moderator = seed_actor(&t.pool, true).await;

    let mut touched = Vec::new();
    for i in 0..3 {
        let note = t
            .db
            .notes
            .create(NoteDraft::new(post, Rect::new(i, i, 5, 5), "good"), &author)
            .await
            .unwrap();
        for _ in 0..2 {
            t.db.notes
                .update(
                    note.id,
                    NotePatch {
                        body: Some("bad".to_string()),
                        ..Default::default()
                    },
                    &vandal,
                )
                .await
                .unwrap();
        }
        touched.push(note.id);
    }
    let spared = t
        .db
        .notes
        .create(NoteDraft::new(post, Rect::new(50, 50, 5, 5), "spared"), &author)
        .await
        .unwrap();

    let report = t
        .db
        .undo
        .undo_all_by_actor(vandal.id, &moderator)
        .await
        .unwrap();

    touched.sort();
    assert_eq!(report.versions_deleted, 6);
    assert_eq!(report.notes_reverted, touched);
    for id in &touched {
        assert_eq!(t.db.notes.fetch(*id).await.unwrap().body, "good");
    }
    assert_eq!(t.db.notes.fetch(spared.id).await.unwrap(), spared);
}
