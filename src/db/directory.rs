//! Officer directory: locality membership, availability, load accounting.
//!
//! Selection is always least-loaded-first among `available` officers whose
//! locality set contains the complaint's key exactly; ties break on officer
//! id so repeated queries agree. The load counters have exactly one write
//! path, `adjust_load`, and it only runs inside a transaction that also
//! mutates the complaint or backlog entry the delta accounts for.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::warn;
use uuid::Uuid;

use crate::db::Db;
use crate::error::{Error, Result};
use crate::model::{Availability, NewOfficer, Officer, OfficerId, OfficerPatch};

impl Db {
    /// Least-loaded available officer serving `locality`, if any.
    ///
    /// Read-only. Callers that go on to assign must use
    /// [`lock_next_available`] inside their transaction instead.
    pub async fn find_available(&self, locality: &str) -> Result<Option<Officer>> {
        let row: Option<OfficerRow> = sqlx::query_as(
            "SELECT o.id, o.name, o.department, o.designation, o.email, o.phone,
                    o.availability, o.availability_reason, o.pending_count, o.solved_count,
                    o.created_at, o.updated_at
             FROM officers o
             JOIN officer_localities ol ON ol.officer_id = o.id
             WHERE ol.locality = $1 AND o.availability = 'available'
             ORDER BY o.pending_count ASC, o.id ASC
             LIMIT 1",
        )
        .bind(locality)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let localities = localities_for(&self.pool, row.id).await?;
                Ok(Some(row.try_into_officer(localities)?))
            }
            None => Ok(None),
        }
    }

    /// Register a new officer and their locality set.
    pub async fn create_officer(&self, new: NewOfficer) -> Result<Officer> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO officers (id, name, department, designation, email, phone, availability)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&new.name)
        .bind(&new.department)
        .bind(&new.designation)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.availability.to_string())
        .execute(&mut *tx)
        .await?;

        for locality in &new.localities {
            sqlx::query(
                "INSERT INTO officer_localities (officer_id, locality)
                 VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(locality)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get_officer(OfficerId(id)).await
    }

    /// Get an officer by ID.
    pub async fn get_officer(&self, id: OfficerId) -> Result<Officer> {
        let row: Option<OfficerRow> = sqlx::query_as(
            "SELECT o.id, o.name, o.department, o.designation, o.email, o.phone,
                    o.availability, o.availability_reason, o.pending_count, o.solved_count,
                    o.created_at, o.updated_at
             FROM officers o
             WHERE o.id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| Error::NotFound(format!("officer {id}")))?;
        let localities = localities_for(&self.pool, row.id).await?;
        row.try_into_officer(localities)
    }

    /// All officers serving a locality, regardless of availability.
    pub async fn officers_for_locality(&self, locality: &str) -> Result<Vec<Officer>> {
        let rows: Vec<OfficerRow> = sqlx::query_as(
            "SELECT o.id, o.name, o.department, o.designation, o.email, o.phone,
                    o.availability, o.availability_reason, o.pending_count, o.solved_count,
                    o.created_at, o.updated_at
             FROM officers o
             JOIN officer_localities ol ON ol.officer_id = o.id
             WHERE ol.locality = $1
             ORDER BY o.name ASC, o.id ASC",
        )
        .bind(locality)
        .fetch_all(&self.pool)
        .await?;

        let mut officers = Vec::with_capacity(rows.len());
        for row in rows {
            let localities = localities_for(&self.pool, row.id).await?;
            officers.push(row.try_into_officer(localities)?);
        }
        Ok(officers)
    }

    /// Apply a partial update. No-op patches return the current record.
    pub async fn update_officer(&self, id: OfficerId, patch: OfficerPatch) -> Result<Officer> {
        if patch.is_empty() {
            return self.get_officer(id).await;
        }

        let mut tx = self.pool.begin().await?;

        let rows_affected = sqlx::query(
            "UPDATE officers SET
                 department   = COALESCE($1, department),
                 designation  = COALESCE($2, designation),
                 availability = COALESCE($3, availability),
                 updated_at   = now()
             WHERE id = $4",
        )
        .bind(patch.department)
        .bind(patch.designation)
        .bind(patch.availability.map(|a| a.to_string()))
        .bind(id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("officer {id}")));
        }

        if let Some(localities) = patch.localities {
            sqlx::query("DELETE FROM officer_localities WHERE officer_id = $1")
                .bind(id.0)
                .execute(&mut *tx)
                .await?;
            for locality in &localities {
                sqlx::query(
                    "INSERT INTO officer_localities (officer_id, locality)
                     VALUES ($1, $2)
                     ON CONFLICT DO NOTHING",
                )
                .bind(id.0)
                .bind(locality)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        self.get_officer(id).await
    }

    /// Change an officer's availability, with an optional reason.
    pub async fn set_availability(
        &self,
        id: OfficerId,
        availability: Availability,
        reason: Option<&str>,
    ) -> Result<Officer> {
        let rows_affected = sqlx::query(
            "UPDATE officers SET availability = $1, availability_reason = $2, updated_at = now()
             WHERE id = $3",
        )
        .bind(availability.to_string())
        .bind(reason)
        .bind(id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("officer {id}")));
        }

        let officer = self.get_officer(id).await?;
        if matches!(
            availability,
            Availability::Unavailable | Availability::OnLeave
        ) && officer.pending_count > 0
        {
            // Their open complaints stay put; admins may want to reassign.
            warn!(
                officer = %id,
                status = %availability,
                pending = officer.pending_count,
                "officer went off duty with open assignments"
            );
        }
        Ok(officer)
    }
}

/// Same selection as [`Db::find_available`], but takes a row lock on the
/// chosen officer for the rest of the transaction. Rows locked by a
/// concurrent assignment are skipped, so two transactions can never pick
/// the same officer: the loser selects the next candidate or none.
pub(crate) async fn lock_next_available(
    conn: &mut PgConnection,
    locality: &str,
) -> Result<Option<Officer>> {
    let row: Option<OfficerRow> = sqlx::query_as(
        "SELECT o.id, o.name, o.department, o.designation, o.email, o.phone,
                o.availability, o.availability_reason, o.pending_count, o.solved_count,
                o.created_at, o.updated_at
         FROM officers o
         JOIN officer_localities ol ON ol.officer_id = o.id
         WHERE ol.locality = $1 AND o.availability = 'available'
         ORDER BY o.pending_count ASC, o.id ASC
         LIMIT 1
         FOR UPDATE OF o SKIP LOCKED",
    )
    .bind(locality)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let localities = localities_for(&mut *conn, row.id).await?;
            Ok(Some(row.try_into_officer(localities)?))
        }
        None => Ok(None),
    }
}

/// Apply load deltas to an officer's counters.
///
/// Must run inside the transaction that mutates the complaint or backlog
/// entry the deltas account for, with the officer row already locked when
/// deltas can race (the assigner's [`lock_next_available`] does this).
pub(crate) async fn adjust_load(
    conn: &mut PgConnection,
    officer_id: OfficerId,
    pending_delta: i32,
    solved_delta: i32,
) -> Result<()> {
    let rows_affected = sqlx::query(
        "UPDATE officers
         SET pending_count = pending_count + $1,
             solved_count  = solved_count + $2,
             updated_at    = now()
         WHERE id = $3",
    )
    .bind(pending_delta)
    .bind(solved_delta)
    .bind(officer_id.0)
    .execute(conn)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(Error::NotFound(format!("officer {officer_id}")));
    }
    Ok(())
}

async fn localities_for<'e, E>(executor: E, officer_id: Uuid) -> Result<Vec<String>>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT locality FROM officer_localities WHERE officer_id = $1 ORDER BY locality",
    )
    .bind(officer_id)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(|(locality,)| locality).collect())
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct OfficerRow {
    id: Uuid,
    name: String,
    department: String,
    designation: String,
    email: String,
    phone: String,
    availability: String,
    availability_reason: Option<String>,
    pending_count: i32,
    solved_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OfficerRow {
    fn try_into_officer(self, localities: Vec<String>) -> Result<Officer> {
        Ok(Officer {
            id: OfficerId(self.id),
            name: self.name,
            department: self.department,
            designation: self.designation,
            email: self.email,
            phone: self.phone,
            localities,
            availability: self.availability.parse()?,
            availability_reason: self.availability_reason,
            pending_count: self.pending_count,
            solved_count: self.solved_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
