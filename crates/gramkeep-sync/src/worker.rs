// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sync worker loop.
//!
//! Exactly one loop runs per process; re-entrancy is guarded by an atomic
//! `processing` flag, so `resume()` can be called from any number of tool
//! handlers without spawning a second loop. Each pass over a job runs two
//! phases: newer-sync (everything above `last_message_id`) and backfill
//! (walking backward from `oldest_message_id` until the archive holds
//! `target_message_count` messages). Flood waits park the job as pending
//! and sleep; all sleeps abort promptly on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use gramkeep_config::SyncConfig;
use gramkeep_core::{GramkeepError, HistoryRequest, PeerSelector, TelegramGateway};
use gramkeep_storage::{ArchiveStore, JobFinalize, JobStatus, NewMessage, SyncJob};

/// The background archiver.
pub struct SyncWorker {
    store: Arc<ArchiveStore>,
    gateway: Arc<dyn TelegramGateway>,
    config: SyncConfig,
    processing: AtomicBool,
    cancel: CancellationToken,
}

impl SyncWorker {
    pub fn new(
        store: Arc<ArchiveStore>,
        gateway: Arc<dyn TelegramGateway>,
        config: SyncConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            processing: AtomicBool::new(false),
            cancel,
        }
    }

    /// Kick the worker loop if it is not already running.
    ///
    /// Called at startup and after every `scheduleMessageSync`. Safe to
    /// call concurrently: losers of the flag race return immediately.
    pub fn resume(self: Arc<Self>) {
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync loop already running");
            return;
        }

        let worker = self;
        tokio::spawn(async move {
            loop {
                worker.run_loop().await;
                worker.processing.store(false, Ordering::SeqCst);

                // A resume() that lost the flag race while we were exiting
                // may have left a fresh job behind; re-check before parking.
                if worker.cancel.is_cancelled() {
                    break;
                }
                match worker.store.next_job().await {
                    Ok(Some(_))
                        if worker
                            .processing
                            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                            .is_ok() =>
                    {
                        continue;
                    }
                    _ => break,
                }
            }
        });
    }

    /// Request shutdown and wait for the in-flight job to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        while self.processing.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        info!("sync worker stopped");
    }

    /// Whether a loop is currently active (used by tests).
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    async fn run_loop(&self) {
        debug!("sync loop started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let job = match self.store.next_job().await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    debug!("no waiting jobs, sync loop parking");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "failed to fetch next job");
                    break;
                }
            };

            if let Err(e) = self.process_job(&job).await {
                // process_job only propagates bookkeeping failures; anything
                // sync-related is recorded on the job row instead.
                error!(channel = %job.channel_id, error = %e, "job bookkeeping failed");
            }

            if self.sleep_cancellable(self.config.inter_job_delay()).await {
                break;
            }
        }
    }

    /// Run one sync pass over a job, recording the outcome on the row.
    async fn process_job(&self, job: &SyncJob) -> Result<(), GramkeepError> {
        self.store
            .mark_status(job.id, JobStatus::InProgress, None)
            .await?;

        let channel_id: i64 = match job.channel_id.parse() {
            Ok(id) => id,
            Err(_) => {
                let message = format!("malformed channel id `{}`", job.channel_id);
                self.store
                    .mark_status(job.id, JobStatus::Error, Some(message.clone()))
                    .await?;
                warn!(channel = %job.channel_id, "skipping job with malformed channel id");
                return Ok(());
            }
        };

        match self.sync_job(job, &PeerSelector::Id(channel_id)).await {
            Ok(()) => Ok(()),
            Err(GramkeepError::FloodWait { seconds }) => {
                let message = format!("Rate limited, waiting {seconds}s");
                self.store
                    .mark_status(job.id, JobStatus::Pending, Some(message))
                    .await?;
                warn!(channel = %job.channel_id, seconds, "flood wait, parking job");
                // Do not re-enter this job now; the loop picks it up again
                // after the wait.
                self.sleep_cancellable(Duration::from_secs(u64::from(seconds)))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.store
                    .mark_status(job.id, JobStatus::Error, Some(e.to_string()))
                    .await?;
                error!(channel = %job.channel_id, error = %e, "job failed");
                Ok(())
            }
        }
    }

    /// The two sync phases plus finalization.
    async fn sync_job(&self, job: &SyncJob, selector: &PeerSelector) -> Result<(), GramkeepError> {
        let peer = self.gateway.resolve_peer(selector).await?;
        let batch = self.config.batch_size;

        // Phase A: pull everything newer than the high-water mark.
        let fetched = self
            .gateway
            .fetch_history(
                selector,
                HistoryRequest {
                    limit: batch,
                    min_id: Some(job.last_message_id),
                    ..HistoryRequest::default()
                },
            )
            .await?;
        let fetched_count = fetched.len();

        let mut newer: Vec<_> = fetched
            .into_iter()
            .filter(|m| m.id > job.last_message_id)
            .collect();
        newer.sort_by_key(|m| m.id);

        let mut last_message_id = job.last_message_id;
        let mut oldest_message_id = job.oldest_message_id;
        if let (Some(first), Some(last)) = (newer.first(), newer.last()) {
            let records: Vec<NewMessage> = newer
                .iter()
                .map(|m| NewMessage::from_archived(&job.channel_id, m))
                .collect();
            self.store.insert_messages(&records).await?;
            last_message_id = last_message_id.max(last.id);
            oldest_message_id = Some(oldest_message_id.map_or(first.id, |o| o.min(first.id)));
            debug!(
                channel = %job.channel_id,
                newer = records.len(),
                last_message_id,
                "newer-sync complete"
            );
        }
        let has_more_newer = fetched_count == batch;

        // Phase B: backfill toward the target depth.
        let target = job.target_message_count;
        let mut count = self.store.count_messages(&job.channel_id).await?;
        let mut inserted_older = 0usize;
        if count < target {
            let mut offset_id = oldest_message_id;
            loop {
                if self.cancel.is_cancelled() {
                    break;
                }
                let chunk_limit = (target - count).min(batch as i64);
                if chunk_limit <= 0 {
                    break;
                }
                let chunk = self
                    .gateway
                    .fetch_history(
                        selector,
                        HistoryRequest {
                            limit: chunk_limit as usize,
                            offset_id,
                            ..HistoryRequest::default()
                        },
                    )
                    .await?;
                if chunk.is_empty() {
                    debug!(channel = %job.channel_id, "history exhausted");
                    break;
                }

                let records: Vec<NewMessage> = chunk
                    .iter()
                    .map(|m| NewMessage::from_archived(&job.channel_id, m))
                    .collect();
                inserted_older += self.store.insert_messages(&records).await?;

                let chunk_min = chunk.iter().map(|m| m.id).min().unwrap_or(0);
                let chunk_max = chunk.iter().map(|m| m.id).max().unwrap_or(0);
                oldest_message_id =
                    Some(oldest_message_id.map_or(chunk_min, |o| o.min(chunk_min)));
                last_message_id = last_message_id.max(chunk_max);
                offset_id = Some(chunk_min);

                count = self.store.count_messages(&job.channel_id).await?;
                if count >= target {
                    break;
                }
                if self
                    .sleep_cancellable(self.config.inter_batch_delay())
                    .await
                {
                    break;
                }
            }
        }
        let has_more_older = inserted_older > 0 && count < target;

        let status = if has_more_newer || has_more_older {
            JobStatus::Pending
        } else {
            JobStatus::Idle
        };
        self.store
            .finalize_job(
                job.id,
                &JobFinalize {
                    peer_title: peer.title.clone(),
                    peer_type: peer.kind.to_string(),
                    status,
                    last_message_id,
                    oldest_message_id,
                    message_count: count,
                    target_message_count: target,
                },
            )
            .await?;

        info!(
            channel = %job.channel_id,
            title = %peer.title,
            message_count = count,
            last_message_id,
            ?status,
            "sync pass complete"
        );
        Ok(())
    }

    /// Sleep unless shutdown is requested; returns true when cancelled.
    async fn sleep_cancellable(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.cancel.cancelled() => true,
        }
    }
}
