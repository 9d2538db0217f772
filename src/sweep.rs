//! Periodic backlog sweep.
//!
//! One sweeper per process. Each tick walks every locality with queued
//! work and drains up to `max_per_locality` entries from each. Ticks never
//! overlap: the run loop is sequential and `tick` itself is single-flight,
//! so two sweeps cannot race on the same officer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::{error, info};

use crate::assign::Assigner;
use crate::db::Db;
use crate::error::Result;
use crate::telemetry::metrics;

/// Configuration for the sweeper.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Entries drained per locality per tick. The portal historically
    /// drained one; raising this drains as far as capacity allows.
    pub max_per_locality: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            max_per_locality: 1,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepReport {
    /// Localities that had queued work when the tick started.
    pub localities: usize,
    /// Entries assigned this tick.
    pub assigned: usize,
    /// Localities abandoned mid-tick because of an error.
    pub failed: usize,
}

/// The backlog-draining loop, with an explicit start/stop lifecycle owned
/// by the process's composition root.
pub struct Sweeper {
    db: Arc<Db>,
    assigner: Assigner,
    config: SweepConfig,
    shutdown: Arc<Notify>,
    tick_lock: Mutex<()>,
}

impl Sweeper {
    pub fn new(db: Arc<Db>, config: SweepConfig) -> Self {
        Self {
            assigner: Assigner::new(Arc::clone(&db)),
            db,
            config,
            shutdown: Arc::new(Notify::new()),
            tick_lock: Mutex::new(()),
        }
    }

    /// Signal the run loop to stop after the current tick.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run until shutdown. Sweeps once immediately, then on every interval.
    pub async fn run(&self) -> Result<()> {
        info!(
            interval_secs = self.config.interval.as_secs(),
            max_per_locality = self.config.max_per_locality,
            "sweeper started"
        );

        loop {
            match self.tick().await {
                Ok(report) if report.localities > 0 => {
                    info!(
                        localities = report.localities,
                        assigned = report.assigned,
                        failed = report.failed,
                        "sweep tick finished"
                    );
                }
                Ok(_) => {}
                Err(e) => error!("sweep tick error: {e}"),
            }

            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("sweeper shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    /// One sweep across all localities with queued work.
    ///
    /// Public so composition roots and tests can drive sweeps without the
    /// wall-clock loop. Single-flight: concurrent callers queue behind the
    /// running tick. A failure in one locality is logged and does not
    /// abort the rest.
    pub async fn tick(&self) -> Result<SweepReport> {
        let _flight = self.tick_lock.lock().await;

        let summary = self.db.backlog_summary().await?;
        let mut report = SweepReport {
            localities: summary.len(),
            ..Default::default()
        };

        for locality in &summary {
            match self.sweep_locality(&locality.locality).await {
                Ok(assigned) => report.assigned += assigned,
                Err(e) => {
                    report.failed += 1;
                    error!(locality = %locality.locality, "sweep failed: {e}");
                }
            }
        }

        metrics::sweep_ticks().add(1, &[]);
        Ok(report)
    }

    async fn sweep_locality(&self, locality: &str) -> Result<usize> {
        let mut assigned = 0;
        for _ in 0..self.config.max_per_locality {
            let Some(entry) = self.db.dequeue_next(locality).await? else {
                break;
            };
            match self.assigner.assign_from_backlog(&entry).await? {
                Some(_) => assigned += 1,
                // No capacity, or a stale entry was retired. Either way
                // this locality is done for the tick.
                None => break,
            }
        }
        Ok(assigned)
    }
}
