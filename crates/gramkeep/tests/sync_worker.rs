// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync worker integration tests over the mock gateway and a temp archive.
//!
//! Each test assembles an isolated TestHarness; tests are independent and
//! order-insensitive.

use std::ops::RangeInclusive;
use std::time::Duration;

use gramkeep_config::SyncConfig;
use gramkeep_core::{ArchivedMessage, GramkeepError, PeerInfo, PeerKind};
use gramkeep_storage::JobStatus;
use gramkeep_test_utils::{MockGateway, TestHarness};

fn user(id: i64, title: &str, username: &str) -> PeerInfo {
    PeerInfo {
        id,
        kind: PeerKind::User,
        title: title.to_string(),
        username: Some(username.to_string()),
    }
}

fn channel(id: i64, title: &str) -> PeerInfo {
    PeerInfo {
        id,
        kind: PeerKind::Channel,
        title: title.to_string(),
        username: None,
    }
}

fn history(peer: &PeerInfo, ids: RangeInclusive<i64>) -> Vec<ArchivedMessage> {
    ids.map(|i| MockGateway::message(peer, i, &format!("message {i}")))
        .collect()
}

// ---- Backfill termination (scenario: 250 messages, depth 200) ----

#[tokio::test]
async fn backfill_reaches_target_depth_then_goes_idle() {
    let peer = user(42, "Gamma", "gamma");
    let harness = TestHarness::builder()
        .with_dialog(peer.clone())
        .with_history(42, history(&peer, 1..=250))
        .build()
        .await
        .unwrap();

    harness.store.upsert_job("42", "Gamma", "user", 200).await.unwrap();
    let jobs = harness
        .run_worker_until_settled(Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.status, JobStatus::Idle);
    assert_eq!(job.message_count, 200);
    assert_eq!(job.last_message_id, 250);
    assert_eq!(job.oldest_message_id, Some(51));
    assert!(job.error.is_none());
    assert!(job.last_synced_at.is_some());
    assert_eq!(harness.store.count_messages("42").await.unwrap(), 200);

    // Once idle, another resume must not issue history requests.
    let calls_before = harness.gateway.fetch_call_count();
    harness.worker.clone().resume();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.gateway.fetch_call_count(), calls_before);

    harness.shutdown().await.unwrap();
}

// ---- Progress monotonicity across passes ----

#[tokio::test]
async fn progress_is_monotonic_across_passes() {
    let peer = channel(-1001, "Alpha");
    let harness = TestHarness::builder()
        .with_dialog(peer.clone())
        .with_history(-1001, history(&peer, 1..=250))
        .build()
        .await
        .unwrap();

    harness
        .store
        .upsert_job("-1001", "Alpha", "channel", 100)
        .await
        .unwrap();
    let first_pass = harness
        .run_worker_until_settled(Duration::from_secs(10))
        .await
        .unwrap();
    let first = &first_pass[0];
    assert_eq!(first.status, JobStatus::Idle);
    assert_eq!(first.last_message_id, 250);
    assert_eq!(first.oldest_message_id, Some(151));
    assert_eq!(first.message_count, 100);

    // New messages arrive; a re-schedule picks them up.
    for id in 251..=255 {
        harness
            .gateway
            .push_message(-1001, MockGateway::message(&peer, id, "fresh"))
            .await;
    }
    harness
        .store
        .upsert_job("-1001", "Alpha", "channel", 100)
        .await
        .unwrap();
    let second_pass = harness
        .run_worker_until_settled(Duration::from_secs(10))
        .await
        .unwrap();
    let second = &second_pass[0];

    assert!(second.last_message_id >= first.last_message_id);
    assert_eq!(second.last_message_id, 255);
    assert!(second.oldest_message_id.unwrap() <= first.oldest_message_id.unwrap());
    assert_eq!(second.message_count, 105);

    harness.shutdown().await.unwrap();
}

// ---- Flood-wait recovery ----

#[tokio::test]
async fn flood_wait_parks_job_then_recovers() {
    let peer = channel(-1001, "Alpha");
    let harness = TestHarness::builder()
        .with_dialog(peer.clone())
        .with_history(-1001, history(&peer, 1..=10))
        .build()
        .await
        .unwrap();

    harness
        .gateway
        .fail_next_fetch(GramkeepError::FloodWait { seconds: 2 })
        .await;
    harness
        .store
        .upsert_job("-1001", "Alpha", "channel", 10)
        .await
        .unwrap();
    harness.worker.clone().resume();

    // During the 2s cool-off the job sits pending with the marker text.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    let mut observed = false;
    while tokio::time::Instant::now() < deadline {
        let job = harness.store.get_job("-1001").await.unwrap().unwrap();
        if job.error.as_deref() == Some("Rate limited, waiting 2s") {
            assert_eq!(job.status, JobStatus::Pending);
            observed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(observed, "never observed the rate-limit marker");

    // The next loop iteration advances normally.
    let jobs = harness
        .run_worker_until_settled(Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(jobs[0].status, JobStatus::Idle);
    assert_eq!(jobs[0].message_count, 10);
    assert!(jobs[0].error.is_none());

    harness.shutdown().await.unwrap();
}

// ---- Single-writer invariant under concurrent resume ----

#[tokio::test]
async fn concurrent_resume_keeps_one_job_in_flight() {
    let alpha = channel(-1001, "Alpha");
    let beta = channel(-1002, "Beta");
    let harness = TestHarness::builder()
        .with_dialog(alpha.clone())
        .with_dialog(beta.clone())
        .with_history(-1001, history(&alpha, 1..=50))
        .with_history(-1002, history(&beta, 1..=50))
        .build()
        .await
        .unwrap();
    harness.gateway.set_fetch_delay(Duration::from_millis(25));

    harness
        .store
        .upsert_job("-1001", "Alpha", "channel", 50)
        .await
        .unwrap();
    harness
        .store
        .upsert_job("-1002", "Beta", "channel", 50)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let worker = harness.worker.clone();
        handles.push(tokio::spawn(async move {
            worker.resume();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let jobs = harness
        .run_worker_until_settled(Duration::from_secs(15))
        .await
        .unwrap();
    assert!(jobs.iter().all(|j| j.status == JobStatus::Idle));
    assert_eq!(
        harness.gateway.max_concurrent_fetches(),
        1,
        "more than one history fetch was in flight"
    );

    harness.shutdown().await.unwrap();
}

// ---- Errors are recorded and not retried until re-queued ----

#[tokio::test]
async fn transport_error_marks_job_and_waits_for_reschedule() {
    let peer = channel(-1001, "Alpha");
    let harness = TestHarness::builder()
        .with_dialog(peer.clone())
        .with_history(-1001, history(&peer, 1..=5))
        .build()
        .await
        .unwrap();

    harness
        .gateway
        .fail_next_fetch(GramkeepError::transport("connection reset"))
        .await;
    harness
        .store
        .upsert_job("-1001", "Alpha", "channel", 5)
        .await
        .unwrap();

    let jobs = harness
        .run_worker_until_settled(Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(jobs[0].status, JobStatus::Error);
    assert!(jobs[0].error.as_deref().unwrap().contains("connection reset"));

    // Errored jobs are not eligible for the loop.
    assert!(harness.store.next_job().await.unwrap().is_none());

    // A fresh schedule clears the error and the job completes.
    harness
        .store
        .upsert_job("-1001", "Alpha", "channel", 5)
        .await
        .unwrap();
    let jobs = harness
        .run_worker_until_settled(Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(jobs[0].status, JobStatus::Idle);
    assert_eq!(jobs[0].message_count, 5);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn unresolvable_peer_marks_job_errored() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .store
        .upsert_job("-4040", "Ghost", "channel", 10)
        .await
        .unwrap();

    let jobs = harness
        .run_worker_until_settled(Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(jobs[0].status, JobStatus::Error);
    assert!(jobs[0].error.is_some());

    harness.shutdown().await.unwrap();
}

// ---- Shutdown interrupts pacing sleeps ----

#[tokio::test]
async fn shutdown_interrupts_backfill_sleep() {
    let peer = channel(-1001, "Alpha");
    let harness = TestHarness::builder()
        .with_dialog(peer.clone())
        .with_history(-1001, history(&peer, 1..=300))
        .with_sync_config(SyncConfig {
            batch_size: 50,
            inter_job_delay_secs: 0,
            inter_batch_delay_ms: 10_000,
        })
        .build()
        .await
        .unwrap();

    harness
        .store
        .upsert_job("-1001", "Alpha", "channel", 300)
        .await
        .unwrap();
    harness.worker.clone().resume();

    // Let the worker land in the long inter-batch sleep.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = tokio::time::Instant::now();
    harness.worker.shutdown().await;
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "shutdown should interrupt the 10s batch sleep"
    );

    // Partial progress was persisted and the job is still resumable.
    let job = harness.store.get_job("-1001").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.message_count >= 50);

    harness.store.close().await.unwrap();
}
