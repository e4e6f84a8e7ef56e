mod common;

use std::sync::{Arc, atomic::Ordering};
use std::time::Duration;

use cofre::{
    attach::stage::AttachmentStage,
    core::{
        errors::{CofreError, CofreResult},
        models::{TrashKind, is_temp_id},
    },
    sync::session::VaultSession,
};

use common::{TestGateway, draft};

async fn build_session() -> CofreResult<(Arc<TestGateway>, VaultSession)> {
    let gateway = Arc::new(TestGateway::unlocked().await?);
    let session = VaultSession::new(gateway.clone());
    Ok((gateway, session))
}

#[tokio::test]
async fn failed_create_shows_optimistically_then_reverts() -> CofreResult<()> {
    let (gateway, session) = build_session().await?;
    assert!(session.active_secrets().await?.is_empty());

    gateway.fail_create_secret.store(true, Ordering::SeqCst);
    let gate = gateway.gate_create();

    let stage = AttachmentStage::new();
    stage.stage("id_rsa".to_owned(), "application/octet-stream".to_owned(), b"key".to_vec());

    let create = session.create_secret(draft("Doomed"), &stage);
    let observe = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let mid_flight = session.active_secrets().await;
        gate.notify_one();
        mid_flight
    };
    let (created, mid_flight) = tokio::join!(create, observe);

    // The projection was visible while the call was in flight.
    let mid_flight = mid_flight?;
    assert_eq!(mid_flight.len(), 1);
    assert_eq!(mid_flight[0].title, "Doomed");
    assert!(is_temp_id(mid_flight[0].id));

    // Rejection reverts the view and never touches the staged file.
    assert!(matches!(created, Err(CofreError::Remote(_))));
    assert!(session.active_secrets().await?.is_empty());
    assert_eq!(gateway.attachment_add_calls.load(Ordering::SeqCst), 0);
    assert_eq!(stage.len(), 1);
    Ok(())
}

#[tokio::test]
async fn successful_create_flushes_staged_attachments_in_order() -> CofreResult<()> {
    let (_gateway, session) = build_session().await?;

    let stage = AttachmentStage::new();
    stage.stage("first.txt".to_owned(), "text/plain".to_owned(), b"one".to_vec());
    stage.stage("second.txt".to_owned(), "text/plain".to_owned(), b"two".to_vec());

    let created = session.create_secret(draft("Server"), &stage).await?;
    assert!(created.id > 0);
    assert!(stage.is_empty());

    let attachments = session.attachments(created.id).await?;
    let names: Vec<&str> = attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, vec!["first.txt", "second.txt"]);
    assert!(attachments.iter().all(|a| a.secret_id == created.id));
    Ok(())
}

#[tokio::test]
async fn soft_delete_moves_secret_to_trash_view() -> CofreResult<()> {
    let (_gateway, session) = build_session().await?;
    let stage = AttachmentStage::new();
    session.create_secret(draft("Keep A"), &stage).await?;
    let doomed = session.create_secret(draft("Drop"), &stage).await?;
    session.create_secret(draft("Keep B"), &stage).await?;

    session.soft_delete_secret(doomed.id).await?;

    let active = session.active_secrets().await?;
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|secret| secret.id != doomed.id));

    let trash = session.trash().items().await?;
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].id(), doomed.id);
    assert_eq!(trash[0].kind(), TrashKind::Secret);
    Ok(())
}

#[tokio::test]
async fn restore_then_soft_delete_lands_back_in_trash() -> CofreResult<()> {
    let (_gateway, session) = build_session().await?;
    let stage = AttachmentStage::new();
    let secret = session.create_secret(draft("Flapping"), &stage).await?;

    session.soft_delete_secret(secret.id).await?;
    session.trash().restore(TrashKind::Secret, secret.id).await?;
    assert_eq!(session.active_secrets().await?.len(), 1);

    session.soft_delete_secret(secret.id).await?;
    assert!(session.active_secrets().await?.is_empty());
    assert_eq!(session.trash().items().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_trash_purges_every_kind() -> CofreResult<()> {
    let (_gateway, session) = build_session().await?;
    let stage = AttachmentStage::new();
    let a = session.create_secret(draft("A"), &stage).await?;
    let b = session.create_secret(draft("B"), &stage).await?;
    let project = session
        .create_project(cofre::core::models::ProjectDraft {
            name: "Legacy".to_owned(),
            description: None,
        })
        .await?;

    session.soft_delete_secret(a.id).await?;
    session.soft_delete_secret(b.id).await?;
    session.soft_delete_project(project.id).await?;
    assert_eq!(session.trash().items().await?.len(), 3);

    session.trash().empty().await?;
    assert!(session.trash().items().await?.is_empty());
    assert!(matches!(
        session.trash().restore(TrashKind::Secret, a.id).await,
        Err(CofreError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn attachments_added_later_refresh_the_metadata_view() -> CofreResult<()> {
    let (_gateway, session) = build_session().await?;
    let empty = AttachmentStage::new();
    let secret = session.create_secret(draft("Server"), &empty).await?;
    assert!(session.attachments(secret.id).await?.is_empty());

    let stage = AttachmentStage::new();
    stage.stage("notes.md".to_owned(), "text/markdown".to_owned(), b"# ops".to_vec());
    let uploaded = session.add_attachments(secret.id, &stage).await?;
    assert_eq!(uploaded, 1);

    let listed = session.attachments(secret.id).await?;
    assert_eq!(listed.len(), 1);
    let content = session.fetch_attachment(listed[0].id).await?;
    assert_eq!(content, b"# ops");

    session.delete_attachment(listed[0].id, secret.id).await?;
    assert!(session.attachments(secret.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn attach_rejects_record_awaiting_creation() -> CofreResult<()> {
    let (_gateway, session) = build_session().await?;
    let stage = AttachmentStage::new();
    stage.stage("early.txt".to_owned(), "text/plain".to_owned(), b"x".to_vec());

    let result = session.add_attachments(-42, &stage).await;
    assert!(matches!(result, Err(CofreError::Validation(_))));
    assert_eq!(stage.len(), 1);
    Ok(())
}

#[tokio::test]
async fn update_rejects_record_awaiting_creation() -> CofreResult<()> {
    let (_gateway, session) = build_session().await?;
    let stage = AttachmentStage::new();

    let result = session
        .update_secret(-1_700_000_000_000, draft("Too Early"), &stage)
        .await;
    assert!(matches!(result, Err(CofreError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn partial_flush_keeps_remainder_for_retry() -> CofreResult<()> {
    let (gateway, session) = build_session().await?;
    let empty = AttachmentStage::new();
    let secret = session.create_secret(draft("Bundle"), &empty).await?;

    let stage = AttachmentStage::new();
    stage.stage("a.pem".to_owned(), "application/x-pem-file".to_owned(), b"a".to_vec());
    stage.stage("b.pem".to_owned(), "application/x-pem-file".to_owned(), b"b".to_vec());
    stage.stage("c.pem".to_owned(), "application/x-pem-file".to_owned(), b"c".to_vec());
    gateway.fail_attachment_at.store(2, Ordering::SeqCst);

    let result = session
        .update_secret(secret.id, draft("Bundle"), &stage)
        .await;
    assert!(matches!(
        result,
        Err(CofreError::Flush {
            uploaded: 1,
            remaining: 2
        })
    ));

    // Only the unsent files stay staged, in their original order.
    let staged: Vec<String> = stage.pending().iter().map(|p| p.filename.clone()).collect();
    assert_eq!(staged, vec!["b.pem".to_owned(), "c.pem".to_owned()]);

    gateway.fail_attachment_at.store(0, Ordering::SeqCst);
    session
        .update_secret(secret.id, draft("Bundle"), &stage)
        .await?;
    assert!(stage.is_empty());

    let attachments = session.attachments(secret.id).await?;
    let names: Vec<&str> = attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, vec!["a.pem", "b.pem", "c.pem"]);
    Ok(())
}
