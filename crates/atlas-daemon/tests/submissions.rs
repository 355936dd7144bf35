//! Exactly-once submission against real Groth16 proofs.

mod common;

use atlas_daemon::SubmissionOutcome;
use atlas_types::{AtlasError, IdempotencyKey};
use common::*;
use futures::future::join_all;
use std::sync::Arc;

#[tokio::test]
async fn test_end_to_end_create_replay_and_duplicate() {
    let node = node();
    let member = populate(&node).await;
    let path = current_path(&node).await;
    assert_eq!(path.global_root, node.atlas().head().global_root);

    let proof = prove(&member, &path, "petition-42", 1);
    let pipeline = node.pipeline();
    let key = IdempotencyKey::new();

    let created = pipeline.submit(request(&proof, Some(key))).await.unwrap();
    assert!(matches!(created, SubmissionOutcome::Created(_)));
    let id = created.submission().id;
    assert_eq!(created.submission().nullifier, proof.public_inputs.nullifier);

    // same action, new logical attempt
    let err = pipeline
        .submit(request(&proof, Some(IdempotencyKey::new())))
        .await
        .unwrap_err();
    assert!(matches!(err, AtlasError::DuplicateAction(_)));
    assert_eq!(err.http_status(), 409);

    // retry of the first attempt
    let replayed = pipeline.submit(request(&proof, Some(key))).await.unwrap();
    assert!(replayed.is_replay());
    assert_eq!(replayed.submission().id, id);

    let stats = pipeline.stats();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.replayed, 1);
}

#[tokio::test]
async fn test_fresh_proof_for_same_action_is_still_duplicate() {
    let node = node();
    let member = populate(&node).await;
    let path = current_path(&node).await;

    let first = prove(&member, &path, "petition-42", 1);
    let second = prove(&member, &path, "petition-42", 2);
    assert_ne!(first.proof, second.proof);
    assert_eq!(first.public_inputs.nullifier, second.public_inputs.nullifier);

    node.pipeline().submit(request(&first, None)).await.unwrap();
    let err = node.pipeline().submit(request(&second, None)).await.unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_ACTION");

    let other_action = prove(&member, &path, "petition-43", 3);
    let outcome = node.pipeline().submit(request(&other_action, None)).await.unwrap();
    assert!(!outcome.is_replay());
}

#[tokio::test]
async fn test_tampered_inputs_are_rejected_and_not_stored() {
    let node = node();
    let member = populate(&node).await;
    let path = current_path(&node).await;
    let proof = prove(&member, &path, "petition-42", 1);

    let mut tampered = request(&proof, None);
    tampered.public_inputs.action_context_hash = atlas_crypto::action_context_hash_bytes("petition-99");
    let err = node.pipeline().submit(tampered).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_PROOF");
    assert_eq!(node.storage().submission_count(), 0);

    // the untouched proof still goes through
    node.pipeline().submit(request(&proof, None)).await.unwrap();
    assert_eq!(node.storage().submission_count(), 1);
}

#[tokio::test]
async fn test_superseded_root_accepted_inside_window_only() {
    let node = node_with(config(2));
    let member = populate(&node).await;
    let old_path = current_path(&node).await;
    let proof = prove(&member, &old_path, "petition-42", 1);

    // one newer version: old root is still in the window
    let atlas = node.atlas();
    atlas
        .register_commitment(&[district()], atlas_types::FieldBytes::from_bytes([0x01; 32]))
        .await
        .unwrap();
    assert_ne!(atlas.head().global_root, old_path.global_root);
    let stale_check = node.pipeline().submit(request(&proof, None)).await;
    assert!(stale_check.is_ok());

    let later = prove(&member, &old_path, "petition-43", 2);
    for byte in 2..5u8 {
        atlas
            .register_commitment(&[district()], atlas_types::FieldBytes::from_bytes([byte; 32]))
            .await
            .unwrap();
    }
    let err = node.pipeline().submit(request(&later, None)).await.unwrap_err();
    assert_eq!(err.code(), "STALE_ROOT");
    assert_eq!(err.http_status(), 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_same_nullifier_creates_exactly_once() {
    let node = node();
    let member = populate(&node).await;
    let path = current_path(&node).await;
    let proof = prove(&member, &path, "petition-42", 1);
    let pipeline = node.pipeline();

    let handles = (0..50).map(|_| {
        let pipeline = Arc::clone(&pipeline);
        let req = request(&proof, Some(IdempotencyKey::new()));
        tokio::spawn(async move { pipeline.submit(req).await })
    });

    let mut created = 0;
    let mut duplicates = 0;
    for joined in join_all(handles).await {
        match joined.unwrap() {
            Ok(SubmissionOutcome::Created(_)) => created += 1,
            Err(AtlasError::DuplicateAction(_)) => duplicates += 1,
            other => panic!("unexpected outcome: {:?}", other.map(|o| o.is_replay())),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 49);
    assert_eq!(node.storage().submission_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_retries_of_one_attempt_share_one_row() {
    let node = node();
    let member = populate(&node).await;
    let path = current_path(&node).await;
    let proof = prove(&member, &path, "petition-42", 1);
    let pipeline = node.pipeline();
    let key = IdempotencyKey::new();

    let handles = (0..16).map(|_| {
        let pipeline = Arc::clone(&pipeline);
        let req = request(&proof, Some(key));
        tokio::spawn(async move { pipeline.submit(req).await })
    });

    let mut ids = Vec::new();
    let mut fresh = 0;
    for joined in join_all(handles).await {
        let outcome = joined.unwrap().unwrap();
        if !outcome.is_replay() {
            fresh += 1;
        }
        ids.push(outcome.submission().id);
    }

    assert_eq!(fresh, 1);
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(node.storage().submission_count(), 1);
}
