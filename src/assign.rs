//! Complaint assignment: the synchronous submission path and the
//! backlog-drain path used by the sweeper.
//!
//! Both paths run as a single transaction: lock an officer, flip the
//! complaint, bump the load counter, append the audit line (and retire the
//! backlog entry when draining). A committed assignment always carries its
//! counter increment, and vice versa.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::{Instrument, info, warn};

use crate::db::{Db, backlog, complaints, directory};
use crate::db::backlog::EnqueueResult;
use crate::error::{Error, Result};
use crate::model::{Assignment, BacklogEntry, ComplaintId, Priority};
use crate::telemetry::assign::{record_state_transition, start_assign_span};
use crate::telemetry::metrics;

/// Matches one complaint to one officer. Cheap to clone; all state lives
/// in the database.
#[derive(Clone)]
pub struct Assigner {
    db: Arc<Db>,
}

impl Assigner {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Try to place a complaint with an officer right now.
    ///
    /// Returns the assignment on success. `None` means no officer serves
    /// this locality at the moment and the complaint was queued — callers
    /// must read that as "queued", not as failure.
    pub async fn try_assign(
        &self,
        complaint_id: ComplaintId,
        locality: &str,
        priority: Priority,
    ) -> Result<Option<Assignment>> {
        let span = start_assign_span("submit", &complaint_id, locality);
        async {
            let start = Instant::now();
            let mut tx = self.db.pool().begin().await?;

            let Some(officer) = directory::lock_next_available(&mut tx, locality).await? else {
                tx.rollback().await?;
                match self.db.enqueue(complaint_id, locality, priority).await? {
                    EnqueueResult::Queued(entry) => {
                        info!(
                            complaint = %complaint_id,
                            locality,
                            entry = %entry.id,
                            "no officer available, complaint queued"
                        );
                    }
                    EnqueueResult::AlreadyQueued(_) => {
                        info!(
                            complaint = %complaint_id,
                            locality,
                            "no officer available, complaint already queued"
                        );
                    }
                }
                metrics::assignments().add(
                    1,
                    &[
                        KeyValue::new("path", "submit"),
                        KeyValue::new("result", "queued"),
                    ],
                );
                return Ok(None);
            };

            complaints::record_assignment(&mut tx, complaint_id, officer.id).await?;
            directory::adjust_load(&mut tx, officer.id, 1, 0).await?;
            complaints::add_update(
                &mut tx,
                complaint_id,
                Some(officer.id),
                &format!(
                    "Complaint assigned to {} ({})",
                    officer.name, officer.designation
                ),
            )
            .await?;
            tx.commit().await?;

            record_state_transition(&tracing::Span::current(), "pending", "assigned");
            info!(
                complaint = %complaint_id,
                officer = %officer.id,
                locality,
                "complaint assigned"
            );
            metrics::assignments().add(
                1,
                &[
                    KeyValue::new("path", "submit"),
                    KeyValue::new("result", "assigned"),
                ],
            );
            metrics::operation_duration_ms().record(
                start.elapsed().as_millis() as f64,
                &[KeyValue::new("operation", "assign.submit")],
            );
            Ok(Some(Assignment::from(&officer)))
        }
        .instrument(span)
        .await
    }

    /// Drain one backlog entry. Used only by the sweeper.
    ///
    /// `None` means no capacity — the entry stays `queued`, which is
    /// expected and transient. An entry whose complaint already left
    /// `pending` is retired to `error` instead of being retried forever.
    pub async fn assign_from_backlog(&self, entry: &BacklogEntry) -> Result<Option<Assignment>> {
        let span = start_assign_span("sweep", &entry.complaint_id, &entry.locality);
        async {
            let start = Instant::now();
            let mut tx = self.db.pool().begin().await?;

            let Some(officer) = directory::lock_next_available(&mut tx, &entry.locality).await?
            else {
                tx.rollback().await?;
                metrics::assignments().add(
                    1,
                    &[
                        KeyValue::new("path", "sweep"),
                        KeyValue::new("result", "no_capacity"),
                    ],
                );
                return Ok(None);
            };

            match complaints::record_assignment(&mut tx, entry.complaint_id, officer.id).await {
                Ok(()) => {}
                Err(Error::Conflict(_)) => {
                    // The complaint was assigned or closed outside the queue.
                    backlog::mark_error(&mut tx, entry.id).await?;
                    tx.commit().await?;
                    warn!(
                        complaint = %entry.complaint_id,
                        entry = %entry.id,
                        "stale backlog entry retired"
                    );
                    metrics::assignments().add(
                        1,
                        &[
                            KeyValue::new("path", "sweep"),
                            KeyValue::new("result", "stale"),
                        ],
                    );
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }

            directory::adjust_load(&mut tx, officer.id, 1, 0).await?;
            complaints::add_update(
                &mut tx,
                entry.complaint_id,
                Some(officer.id),
                &format!(
                    "Complaint assigned to {} ({})",
                    officer.name, officer.designation
                ),
            )
            .await?;
            backlog::mark_assigned(&mut tx, entry.id, officer.id).await?;
            tx.commit().await?;

            record_state_transition(&tracing::Span::current(), "pending", "assigned");
            info!(
                complaint = %entry.complaint_id,
                officer = %officer.id,
                locality = %entry.locality,
                "backlog entry assigned"
            );
            metrics::assignments().add(
                1,
                &[
                    KeyValue::new("path", "sweep"),
                    KeyValue::new("result", "assigned"),
                ],
            );
            metrics::operation_duration_ms().record(
                start.elapsed().as_millis() as f64,
                &[KeyValue::new("operation", "assign.sweep")],
            );
            Ok(Some(Assignment::from(&officer)))
        }
        .instrument(span)
        .await
    }
}
