//! Broadcast engine.
//!
//! - `submit` validates + persists a job and returns its id without waiting
//! - each job runs on its own tracked task, bounded by a semaphore
//! - delivery is sequential over a recipient snapshot taken at run start,
//!   with a fixed pause between attempts whatever their outcome
//! - per-recipient failures are logged and counted, never propagated
//! - the final delivered count is written back exactly once

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::Semaphore;
use tokio::time::{sleep, Instant};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::{
    domain::{JobId, UserId},
    messaging::port::MessagingPort,
    model::{BroadcastJob, JobStatus},
    ports::{JobLedger, RecipientStore},
    utils::{now_ts, truncate_chars},
    Error, Result,
};

pub const DEFAULT_PACING: Duration = Duration::from_millis(120);
pub const DEFAULT_MAX_PAYLOAD_CHARS: usize = 4000;
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;

#[derive(Clone, Copy, Debug)]
pub struct BroadcastConfig {
    /// Pause between two consecutive delivery attempts of one job.
    pub pacing: Duration,
    pub max_payload_chars: usize,
    /// Jobs beyond this wait for a free slot before snapshotting.
    pub max_concurrent_jobs: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            max_payload_chars: DEFAULT_MAX_PAYLOAD_CHARS,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }
}

/// Outcome of a single delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed(DeliveryFailure),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub recipient: UserId,
    pub cause: String,
}

impl From<DeliveryFailure> for Error {
    fn from(f: DeliveryFailure) -> Self {
        Error::Delivery {
            recipient: f.recipient,
            cause: f.cause,
        }
    }
}

/// Tally of one finished run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastReport {
    pub job_id: JobId,
    pub snapshot_size: usize,
    pub delivered: u64,
    pub failures: Vec<DeliveryFailure>,
}

impl BroadcastReport {
    fn new(job_id: JobId, snapshot_size: usize) -> Self {
        Self {
            job_id,
            snapshot_size,
            delivered: 0,
            failures: Vec::new(),
        }
    }

    fn record(mut self, delivery: Delivery) -> Self {
        match delivery {
            Delivery::Sent => self.delivered += 1,
            Delivery::Failed(f) => self.failures.push(f),
        }
        self
    }
}

/// Trim, reject empty text, cap the length.
pub fn prepare_payload(raw: &str, max_chars: usize) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::Validation("broadcast text is empty".to_string()));
    }
    Ok(truncate_chars(text, max_chars))
}

#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    cfg: BroadcastConfig,
    recipients: Arc<dyn RecipientStore>,
    ledger: Arc<dyn JobLedger>,
    transport: Arc<dyn MessagingPort>,
    slots: Arc<Semaphore>,
    tracker: TaskTracker,
    in_flight: Mutex<HashSet<JobId>>,
}

/// Marks a job as running for as long as it is alive.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<JobId>>,
    job: JobId,
}

impl<'a> InFlight<'a> {
    fn enter(set: &'a Mutex<HashSet<JobId>>, job: JobId) -> Self {
        set.lock().unwrap_or_else(|e| e.into_inner()).insert(job);
        Self { set, job }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.job);
    }
}

impl Broadcaster {
    pub fn new(
        cfg: BroadcastConfig,
        recipients: Arc<dyn RecipientStore>,
        ledger: Arc<dyn JobLedger>,
        transport: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                cfg,
                recipients,
                ledger,
                transport,
                slots: Arc::new(Semaphore::new(cfg.max_concurrent_jobs.max(1))),
                tracker: TaskTracker::new(),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Persist a new job and schedule its delivery in the background.
    ///
    /// Returns as soon as the ledger row exists. The caller is expected to
    /// have checked authorization already.
    pub async fn submit(&self, raw: &str, initiator: UserId) -> Result<JobId> {
        let payload = prepare_payload(raw, self.inner.cfg.max_payload_chars)?;
        let job = self
            .inner
            .ledger
            .create(initiator, &payload, now_ts())
            .await?;

        info!(
            job_id = %job,
            initiator = %initiator,
            chars = payload.chars().count(),
            "broadcast submitted"
        );

        self.spawn(job, payload);
        Ok(job)
    }

    fn spawn(&self, job: JobId, payload: String) {
        let this = self.clone();
        self.inner.tracker.spawn(async move {
            let Ok(_slot) = this.inner.slots.clone().acquire_owned().await else {
                warn!(job_id = %job, "broadcast slots closed; job left pending");
                return;
            };

            // Run on a nested task so a panic is reported instead of vanishing.
            let runner = this.clone();
            let handle = tokio::spawn(async move { runner.run(job, payload).await });
            if let Err(e) = handle.await {
                error!(job_id = %job, error = %e, "broadcast task crashed");
            }
        });
    }

    /// Deliver `payload` to a fresh recipient snapshot and finalize the job.
    pub async fn run(&self, job: JobId, payload: String) -> BroadcastReport {
        let _running = InFlight::enter(&self.inner.in_flight, job);
        let started = Instant::now();

        let snapshot = match self.inner.recipients.list_all().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(job_id = %job, error = %e, "recipient snapshot failed");
                Vec::new()
            }
        };
        info!(job_id = %job, recipients = snapshot.len(), "broadcast started");

        let mut report = BroadcastReport::new(job, snapshot.len());
        for (idx, recipient) in snapshot.into_iter().enumerate() {
            if idx > 0 {
                sleep(self.inner.cfg.pacing).await;
            }
            let delivery = self.deliver(job, recipient, &payload).await;
            report = report.record(delivery);
        }

        if let Err(e) = self.inner.ledger.finalize(job, report.delivered).await {
            error!(
                job_id = %job,
                delivered = report.delivered,
                error = %e,
                "failed to finalize broadcast"
            );
        }

        info!(
            job_id = %job,
            delivered = report.delivered,
            total = report.snapshot_size,
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "broadcast finished"
        );
        report
    }

    async fn deliver(&self, job: JobId, recipient: UserId, payload: &str) -> Delivery {
        match self
            .inner
            .transport
            .send_html(recipient.into(), payload)
            .await
        {
            Ok(_) => Delivery::Sent,
            Err(e) => {
                let failure = DeliveryFailure {
                    recipient,
                    cause: e.to_string(),
                };
                warn!(
                    job_id = %job,
                    recipient = %recipient,
                    error = %Error::from(failure.clone()),
                    "broadcast delivery failed"
                );
                Delivery::Failed(failure)
            }
        }
    }

    pub fn is_running(&self, job: JobId) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&job)
    }

    /// Ledger record with the in-memory `running` state overlaid.
    pub async fn status(&self, job: JobId) -> Result<Option<BroadcastJob>> {
        let record = self.inner.ledger.get(job).await?;
        Ok(record.map(|j| self.overlay(j)))
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<BroadcastJob>> {
        let jobs = self.inner.ledger.recent(limit).await?;
        Ok(jobs.into_iter().map(|j| self.overlay(j)).collect())
    }

    fn overlay(&self, mut job: BroadcastJob) -> BroadcastJob {
        if job.status == JobStatus::Pending && self.is_running(job.id) {
            job.status = JobStatus::Running;
        }
        job
    }

    /// Stop accepting background work and wait for in-flight jobs.
    pub async fn shutdown(&self) {
        self.inner.tracker.close();
        let pending = self.inner.tracker.len();
        if pending > 0 {
            info!(jobs = pending, "waiting for in-flight broadcasts");
        }
        self.inner.tracker.wait().await;
    }
}
