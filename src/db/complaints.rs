//! Complaint records and their audit trail.
//!
//! The assigner owns only the `pending -> assigned` write
//! ([`record_assignment`]); the rest of the lifecycle goes through the
//! validated helpers here. `resolve` and `reopen` settle the assigned
//! officer's counters in the same transaction as the status flip, so a
//! complaint can never be resolved without the matching decrement.

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{Db, directory};
use crate::error::{Error, Result};
use crate::model::{Complaint, ComplaintId, ComplaintStatus, ComplaintUpdate, OfficerId, Priority};
use crate::telemetry::metrics;

/// Validate a status transition, returning an error if disallowed.
fn validate_transition(from: ComplaintStatus, to: ComplaintStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

impl Db {
    /// Insert a new complaint in `pending`. The intake service owns the
    /// full citizen-facing record; this writes the columns the core reads.
    pub async fn create_complaint(&self, locality: &str, priority: Priority) -> Result<Complaint> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO complaints (id, locality, priority, status)
             VALUES ($1, $2, $3, 'pending')",
        )
        .bind(id)
        .bind(locality)
        .bind(priority.to_string())
        .execute(&self.pool)
        .await?;

        self.get_complaint(ComplaintId(id)).await
    }

    /// Get a complaint by ID.
    pub async fn get_complaint(&self, id: ComplaintId) -> Result<Complaint> {
        let row: Option<ComplaintRow> = sqlx::query_as(
            "SELECT id, locality, priority, status, officer_id, created_at, updated_at
             FROM complaints WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| Error::NotFound(format!("complaint {id}")))?
            .try_into_complaint()
    }

    /// Audit trail for a complaint, newest first.
    pub async fn get_updates(&self, id: ComplaintId) -> Result<Vec<ComplaintUpdate>> {
        let rows: Vec<ComplaintUpdateRow> = sqlx::query_as(
            "SELECT id, complaint_id, officer_id, update_text, created_at
             FROM complaint_updates
             WHERE complaint_id = $1
             ORDER BY created_at DESC",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ComplaintUpdateRow::into_update).collect())
    }

    /// Transition a complaint's status with optimistic concurrency.
    ///
    /// For the collaborator-owned edges (`assigned -> in-progress` and the
    /// like); assignment and the counter-bearing edges have their own
    /// entry points.
    pub async fn update_status(
        &self,
        id: ComplaintId,
        from: ComplaintStatus,
        to: ComplaintStatus,
    ) -> Result<Complaint> {
        validate_transition(from, to)?;

        let rows_affected = sqlx::query(
            "UPDATE complaints SET status = $1, updated_at = now()
             WHERE id = $2 AND status = $3",
        )
        .bind(to.to_string())
        .bind(id.0)
        .bind(from.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        metrics::status_transitions().add(
            1,
            &[
                KeyValue::new("from", from.to_string()),
                KeyValue::new("to", to.to_string()),
            ],
        );

        self.get_complaint(id).await
    }

    /// Mark a complaint resolved and settle its officer's counters
    /// (pending -1, solved +1) in one transaction.
    pub async fn resolve(&self, id: ComplaintId) -> Result<Complaint> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Option<Uuid>,)> = sqlx::query_as(
            "UPDATE complaints SET status = 'resolved', updated_at = now()
             WHERE id = $1 AND status IN ('assigned', 'in-progress', 'reopened')
             RETURNING officer_id",
        )
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((officer_id,)) = row else {
            return Err(Error::Conflict(format!("complaint {id} is not open")));
        };

        if let Some(officer_id) = officer_id.map(OfficerId) {
            directory::adjust_load(&mut tx, officer_id, -1, 1).await?;
            add_update(&mut tx, id, Some(officer_id), "Status updated to resolved").await?;
        }

        tx.commit().await?;

        metrics::status_transitions().add(
            1,
            &[KeyValue::new("from", "open"), KeyValue::new("to", "resolved")],
        );

        self.get_complaint(id).await
    }

    /// Reopen a resolved or closed complaint. Ownership stays with the
    /// original officer, even one currently unavailable; the counters move
    /// back (pending +1, solved -1) in the same transaction.
    pub async fn reopen(&self, id: ComplaintId) -> Result<Complaint> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Option<Uuid>,)> = sqlx::query_as(
            "UPDATE complaints SET status = 'reopened', updated_at = now()
             WHERE id = $1 AND status IN ('resolved', 'closed')
             RETURNING officer_id",
        )
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((officer_id,)) = row else {
            return Err(Error::Conflict(format!(
                "complaint {id} is not resolved or closed"
            )));
        };

        if let Some(officer_id) = officer_id.map(OfficerId) {
            directory::adjust_load(&mut tx, officer_id, 1, -1).await?;
            add_update(&mut tx, id, Some(officer_id), "Complaint reopened by citizen").await?;
        }

        tx.commit().await?;

        metrics::status_transitions().add(
            1,
            &[KeyValue::new("from", "closed"), KeyValue::new("to", "reopened")],
        );

        self.get_complaint(id).await
    }
}

/// The assigner's `pending -> assigned` write. A zero-row update means the
/// complaint already moved past `pending` and must not be touched.
pub(crate) async fn record_assignment(
    conn: &mut PgConnection,
    complaint_id: ComplaintId,
    officer_id: OfficerId,
) -> Result<()> {
    let rows_affected = sqlx::query(
        "UPDATE complaints SET status = 'assigned', officer_id = $1, updated_at = now()
         WHERE id = $2 AND status = 'pending'",
    )
    .bind(officer_id.0)
    .bind(complaint_id.0)
    .execute(conn)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(Error::Conflict(format!(
            "complaint {complaint_id} is not pending"
        )));
    }

    metrics::status_transitions().add(
        1,
        &[KeyValue::new("from", "pending"), KeyValue::new("to", "assigned")],
    );
    Ok(())
}

/// Append an audit line for a complaint.
pub(crate) async fn add_update(
    conn: &mut PgConnection,
    complaint_id: ComplaintId,
    officer_id: Option<OfficerId>,
    text: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO complaint_updates (id, complaint_id, officer_id, update_text)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(complaint_id.0)
    .bind(officer_id.map(|o| o.0))
    .bind(text)
    .execute(conn)
    .await?;
    Ok(())
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ComplaintRow {
    id: Uuid,
    locality: String,
    priority: String,
    status: String,
    officer_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ComplaintRow {
    fn try_into_complaint(self) -> Result<Complaint> {
        Ok(Complaint {
            id: ComplaintId(self.id),
            locality: self.locality,
            priority: self.priority.parse()?,
            status: self.status.parse()?,
            officer_id: self.officer_id.map(OfficerId),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ComplaintUpdateRow {
    id: Uuid,
    complaint_id: Uuid,
    officer_id: Option<Uuid>,
    update_text: String,
    created_at: DateTime<Utc>,
}

impl ComplaintUpdateRow {
    fn into_update(self) -> ComplaintUpdate {
        ComplaintUpdate {
            id: self.id,
            complaint_id: ComplaintId(self.complaint_id),
            officer_id: self.officer_id.map(OfficerId),
            update_text: self.update_text,
            created_at: self.created_at,
        }
    }
}
