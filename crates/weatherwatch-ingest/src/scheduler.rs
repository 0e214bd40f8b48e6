//! Fixed-period ingestion driver.
//!
//! Ticks never overlap: a tick runs every configured location in order and
//! the next tick is only awaited once it finishes. Ticks missed while a slow
//! cycle was in flight are skipped rather than bunched up.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pipeline::{IngestionPipeline, TrackedLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// A tick is in progress.
    Running,
    /// Cancelled; no further ticks will run.
    Stopped,
}

/// Published on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Ticks that ran to completion (failed cycles included).
    pub completed_ticks: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("at least one location is required")]
    NoLocations,

    #[error("ingest interval must be greater than zero")]
    ZeroInterval,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Scheduler {
    pipeline: IngestionPipeline,
    locations: Vec<TrackedLocation>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        pipeline: IngestionPipeline,
        locations: Vec<TrackedLocation>,
        interval: Duration,
    ) -> Result<Self, SchedulerError> {
        if locations.is_empty() {
            return Err(SchedulerError::NoLocations);
        }
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }

        Ok(Self {
            pipeline,
            locations,
            interval,
        })
    }

    /// Build from configured location names.
    pub fn from_names<S: AsRef<str>>(
        pipeline: IngestionPipeline,
        names: &[S],
        interval: Duration,
    ) -> Result<Self, SchedulerError> {
        let locations = names
            .iter()
            .map(|name| TrackedLocation::new(name.as_ref()))
            .collect();
        Self::new(pipeline, locations, interval)
    }

    pub fn locations(&self) -> &[TrackedLocation] {
        &self.locations
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle per location, in order. Failures are logged and skipped.
    pub async fn tick(&self) -> TickSummary {
        let mut summary = TickSummary::default();

        for location in &self.locations {
            match self.pipeline.run_cycle(location).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        location = %e.location(),
                        step = %e.step(),
                        transient = e.is_transient(),
                        "Ingestion cycle aborted: {}",
                        e
                    );
                }
            }
        }

        summary
    }

    /// Start the loop on the current runtime. The first tick fires immediately.
    pub fn spawn(self, cancel: CancellationToken) -> SchedulerHandle {
        let (status_tx, status_rx) = watch::channel(SchedulerStatus::default());
        let task = tokio::spawn(self.run(cancel, status_tx));

        SchedulerHandle {
            status: status_rx,
            task,
        }
    }

    async fn run(self, cancel: CancellationToken, status: watch::Sender<SchedulerStatus>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Scheduler started: {} location(s) every {:?}",
            self.locations.len(),
            self.interval
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            status.send_modify(|s| s.state = SchedulerState::Running);

            let summary = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Tick abandoned on shutdown");
                    break;
                }
                summary = self.tick() => summary,
            };

            debug!(
                "Tick finished: {} succeeded, {} failed",
                summary.succeeded, summary.failed
            );
            status.send_modify(|s| {
                s.state = SchedulerState::Idle;
                s.completed_ticks += 1;
            });
        }

        status.send_modify(|s| s.state = SchedulerState::Stopped);
        info!("Scheduler stopped");
    }
}

/// Observes and awaits a spawned [`Scheduler`].
pub struct SchedulerHandle {
    status: watch::Receiver<SchedulerStatus>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        self.status.borrow().state
    }

    pub fn status(&self) -> SchedulerStatus {
        *self.status.borrow()
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }

    /// Wait for the loop to exit. Only returns after the token is cancelled.
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}
