//! Persistent backlog of complaints awaiting an officer.
//!
//! At most one live (`queued`) entry exists per complaint, enforced by a
//! partial unique index; the enqueue path goes through ON CONFLICT so
//! concurrent submissions cannot race past the check. Entries are retired
//! to `assigned` inside the assignment transaction, or to `error` when
//! their complaint left `pending` outside the queue.

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::Db;
use crate::error::{Error, Result};
use crate::model::{BacklogEntry, ComplaintId, EntryId, OfficerId, Priority};
use crate::telemetry::metrics;

/// What happened on enqueue.
#[derive(Debug)]
pub enum EnqueueResult {
    /// A new entry was inserted.
    Queued(BacklogEntry),
    /// The complaint already had a live entry; nothing was written.
    AlreadyQueued(BacklogEntry),
}

impl EnqueueResult {
    /// The live entry, however we came by it.
    pub fn entry(&self) -> &BacklogEntry {
        match self {
            EnqueueResult::Queued(entry) | EnqueueResult::AlreadyQueued(entry) => entry,
        }
    }
}

/// One locality's slice of the backlog summary.
#[derive(Debug, Clone)]
pub struct LocalityBacklog {
    pub locality: String,
    pub queued: i64,
    pub oldest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl Db {
    /// Queue a complaint for later assignment. Idempotent: a complaint
    /// with a live entry is left alone and the existing entry returned.
    pub async fn enqueue(
        &self,
        complaint_id: ComplaintId,
        locality: &str,
        priority: Priority,
    ) -> Result<EnqueueResult> {
        let id = Uuid::new_v4();
        let inserted: Option<BacklogEntryRow> = sqlx::query_as(
            "INSERT INTO complaint_queue (id, complaint_id, locality, priority, status)
             VALUES ($1, $2, $3, $4, 'queued')
             ON CONFLICT (complaint_id) WHERE status = 'queued'
             DO NOTHING
             RETURNING id, complaint_id, locality, priority, status, officer_id, created_at, assigned_at",
        )
        .bind(id)
        .bind(complaint_id.0)
        .bind(locality)
        .bind(priority.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => {
                metrics::backlog_operations().add(1, &[KeyValue::new("operation", "enqueue")]);
                Ok(EnqueueResult::Queued(row.try_into_entry()?))
            }
            None => {
                // Conflict: a live entry exists. Return it untouched.
                let row: BacklogEntryRow = sqlx::query_as(
                    "SELECT id, complaint_id, locality, priority, status, officer_id, created_at, assigned_at
                     FROM complaint_queue
                     WHERE complaint_id = $1 AND status = 'queued'",
                )
                .bind(complaint_id.0)
                .fetch_one(&self.pool)
                .await?;
                metrics::backlog_operations()
                    .add(1, &[KeyValue::new("operation", "enqueue_duplicate")]);
                Ok(EnqueueResult::AlreadyQueued(row.try_into_entry()?))
            }
        }
    }

    /// Next entry to drain for a locality: high before normal before low,
    /// oldest first within a priority. Read-only; [`mark_assigned`]
    /// commits the transition as part of the assignment transaction.
    pub async fn dequeue_next(&self, locality: &str) -> Result<Option<BacklogEntry>> {
        let row: Option<BacklogEntryRow> = sqlx::query_as(
            "SELECT id, complaint_id, locality, priority, status, officer_id, created_at, assigned_at
             FROM complaint_queue
             WHERE locality = $1 AND status = 'queued'
             ORDER BY
               CASE priority WHEN 'high' THEN 1 WHEN 'normal' THEN 2 ELSE 3 END,
               created_at ASC
             LIMIT 1",
        )
        .bind(locality)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into_entry()).transpose()
    }

    /// Localities with queued work, with counts and entry-age bounds.
    /// The sweeper uses this to skip localities with an empty backlog.
    pub async fn backlog_summary(&self) -> Result<Vec<LocalityBacklog>> {
        let rows: Vec<(String, i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT locality, COUNT(*), MIN(created_at), MAX(created_at)
             FROM complaint_queue
             WHERE status = 'queued'
             GROUP BY locality
             ORDER BY locality",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(locality, queued, oldest, latest)| LocalityBacklog {
                locality,
                queued,
                oldest,
                latest,
            })
            .collect())
    }

    /// All queued entries for a locality, in drain order.
    pub async fn queued_for_locality(&self, locality: &str) -> Result<Vec<BacklogEntry>> {
        let rows: Vec<BacklogEntryRow> = sqlx::query_as(
            "SELECT id, complaint_id, locality, priority, status, officer_id, created_at, assigned_at
             FROM complaint_queue
             WHERE locality = $1 AND status = 'queued'
             ORDER BY
               CASE priority WHEN 'high' THEN 1 WHEN 'normal' THEN 2 ELSE 3 END,
               created_at ASC",
        )
        .bind(locality)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into_entry()).collect()
    }
}

/// Retire an entry `queued -> assigned`, stamping `assigned_at`. Part of
/// the assignment transaction; a zero-row update means another writer got
/// there first.
pub(crate) async fn mark_assigned(
    conn: &mut PgConnection,
    entry_id: EntryId,
    officer_id: OfficerId,
) -> Result<()> {
    let rows_affected = sqlx::query(
        "UPDATE complaint_queue
         SET status = 'assigned', officer_id = $1, assigned_at = now()
         WHERE id = $2 AND status = 'queued'",
    )
    .bind(officer_id.0)
    .bind(entry_id.0)
    .execute(conn)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(Error::Conflict(format!("backlog entry {entry_id} is not queued")));
    }
    metrics::backlog_operations().add(1, &[KeyValue::new("operation", "mark_assigned")]);
    Ok(())
}

/// Retire an entry `queued -> error`. Used when the complaint left
/// `pending` outside the queue; keeps the entry from being re-dequeued
/// every tick.
pub(crate) async fn mark_error(conn: &mut PgConnection, entry_id: EntryId) -> Result<()> {
    let rows_affected = sqlx::query(
        "UPDATE complaint_queue SET status = 'error' WHERE id = $1 AND status = 'queued'",
    )
    .bind(entry_id.0)
    .execute(conn)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(Error::Conflict(format!("backlog entry {entry_id} is not queued")));
    }
    metrics::backlog_operations().add(1, &[KeyValue::new("operation", "mark_error")]);
    Ok(())
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct BacklogEntryRow {
    id: Uuid,
    complaint_id: Uuid,
    locality: String,
    priority: String,
    status: String,
    officer_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    assigned_at: Option<DateTime<Utc>>,
}

impl BacklogEntryRow {
    fn try_into_entry(self) -> Result<BacklogEntry> {
        Ok(BacklogEntry {
            id: EntryId(self.id),
            complaint_id: ComplaintId(self.complaint_id),
            locality: self.locality,
            priority: self.priority.parse()?,
            status: self.status.parse()?,
            officer_id: self.officer_id.map(OfficerId),
            created_at: self.created_at,
            assigned_at: self.assigned_at,
        })
    }
}
