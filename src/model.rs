//! Core data model.
//!
//! A complaint is a unit of citizen-reported work keyed by locality
//! (a 6-digit postal code string). Officers serve one or more localities;
//! the backlog holds complaints no officer could take at submission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Newtype for complaint IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComplaintId(pub Uuid);

impl ComplaintId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ComplaintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for ComplaintId {
    fn default() -> Self {
        Self::new()
    }
}

/// Newtype for officer IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfficerId(pub Uuid);

impl OfficerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for OfficerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for OfficerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Newtype for backlog entry IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Complaint priority. The backlog drains high before normal before low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Drain rank; lower drains first.
    pub fn rank(self) -> i16 {
        match self {
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(Error::Other(format!("unknown priority: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Complaint status
// ---------------------------------------------------------------------------

/// Lifecycle status of a complaint.
///
/// The assigner owns only the `Pending -> Assigned` edge; everything after
/// that is driven by the status-update collaborator through the validated
/// helpers in the db layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintStatus {
    /// Submitted, no officer yet.
    Pending,
    /// An officer holds it.
    Assigned,
    /// The officer is working on it.
    InProgress,
    /// The officer finished the work.
    Resolved,
    /// Closed out after citizen feedback.
    Closed,
    /// Re-raised by the citizen after resolution; stays with the original officer.
    Reopened,
}

impl ComplaintStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: ComplaintStatus) -> bool {
        use ComplaintStatus::*;
        matches!(
            (self, to),
            (Pending, Assigned)
                | (Assigned, InProgress)
                | (Assigned, Resolved)      // officer resolves without an in-progress step
                | (InProgress, Resolved)
                | (Resolved, Closed)        // citizen feedback closes it
                | (Resolved, Reopened)
                | (Closed, Reopened)
                | (Reopened, InProgress)
                | (Reopened, Resolved)
        )
    }

    /// Is this a terminal status?
    pub fn is_terminal(self) -> bool {
        matches!(self, ComplaintStatus::Resolved | ComplaintStatus::Closed)
    }

    /// Does this status count toward the assigned officer's pending load?
    pub fn is_active_assignment(self) -> bool {
        matches!(
            self,
            ComplaintStatus::Assigned | ComplaintStatus::InProgress | ComplaintStatus::Reopened
        )
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::Assigned => "assigned",
            ComplaintStatus::InProgress => "in-progress",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Closed => "closed",
            ComplaintStatus::Reopened => "reopened",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "pending" => Ok(ComplaintStatus::Pending),
            "assigned" => Ok(ComplaintStatus::Assigned),
            "in-progress" => Ok(ComplaintStatus::InProgress),
            "resolved" => Ok(ComplaintStatus::Resolved),
            "closed" => Ok(ComplaintStatus::Closed),
            "reopened" => Ok(ComplaintStatus::Reopened),
            other => Err(Error::Other(format!("unknown complaint status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Officer availability. Only `Available` officers are selected for
/// assignment; the rest keep their open complaints but take no new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    #[default]
    Available,
    Busy,
    Unavailable,
    OnLeave,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Availability::Available => "available",
            Availability::Busy => "busy",
            Availability::Unavailable => "unavailable",
            Availability::OnLeave => "on-leave",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Availability {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "available" => Ok(Availability::Available),
            "busy" => Ok(Availability::Busy),
            "unavailable" => Ok(Availability::Unavailable),
            "on-leave" => Ok(Availability::OnLeave),
            other => Err(Error::Other(format!("unknown availability: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue status
// ---------------------------------------------------------------------------

/// Status of a backlog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Waiting for an officer.
    Queued,
    /// Retired: the sweep or a retried submission found an officer.
    Assigned,
    /// Retired: the complaint left `pending` outside the queue.
    Error,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueueStatus::Queued => "queued",
            QueueStatus::Assigned => "assigned",
            QueueStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "queued" => Ok(QueueStatus::Queued),
            "assigned" => Ok(QueueStatus::Assigned),
            "error" => Ok(QueueStatus::Error),
            other => Err(Error::Other(format!("unknown queue status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An officer capable of handling complaints in the localities they serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Officer {
    pub id: OfficerId,
    pub name: String,
    pub department: String,
    pub designation: String,
    pub email: String,
    pub phone: String,
    /// Exact locality keys this officer serves.
    pub localities: Vec<String>,
    pub availability: Availability,
    pub availability_reason: Option<String>,
    /// Open assignments. Equals the number of complaints assigned to this
    /// officer in a non-terminal status; mutated only inside assignment,
    /// resolution and reopen transactions.
    pub pending_count: i32,
    /// Completed assignments.
    pub solved_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Officer {
    /// Exact-match membership test for a locality key.
    pub fn serves(&self, locality: &str) -> bool {
        self.localities.iter().any(|l| l == locality)
    }
}

/// The slice of a complaint record the assignment core reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub id: ComplaintId,
    pub locality: String,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub officer_id: Option<OfficerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A backlog entry: a complaint waiting for capacity in its locality.
/// Locality and priority are denormalized from the complaint for lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogEntry {
    pub id: EntryId,
    pub complaint_id: ComplaintId,
    pub locality: String,
    pub priority: Priority,
    pub status: QueueStatus,
    pub officer_id: Option<OfficerId>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// One line of a complaint's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintUpdate {
    pub id: Uuid,
    pub complaint_id: ComplaintId,
    pub officer_id: Option<OfficerId>,
    pub update_text: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Assignment result
// ---------------------------------------------------------------------------

/// Returned to the submitter on synchronous success: who took the
/// complaint and how to reach them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub officer_id: OfficerId,
    pub officer_name: String,
    pub officer_designation: String,
    pub officer_email: String,
    pub officer_phone: String,
}

impl From<&Officer> for Assignment {
    fn from(officer: &Officer) -> Self {
        Self {
            officer_id: officer.id,
            officer_name: officer.name.clone(),
            officer_designation: officer.designation.clone(),
            officer_email: officer.email.clone(),
            officer_phone: officer.phone.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders and patches
// ---------------------------------------------------------------------------

/// Builder for registering officers with the directory.
pub struct NewOfficer {
    pub(crate) name: String,
    pub(crate) department: String,
    pub(crate) designation: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) localities: Vec<String>,
    pub(crate) availability: Availability,
}

impl NewOfficer {
    pub fn new(name: impl Into<String>, designation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            department: String::new(),
            designation: designation.into(),
            email: String::new(),
            phone: String::new(),
            localities: Vec::new(),
            availability: Availability::Available,
        }
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn locality(mut self, locality: impl Into<String>) -> Self {
        self.localities.push(locality.into());
        self
    }

    pub fn localities(mut self, localities: impl IntoIterator<Item = String>) -> Self {
        self.localities.extend(localities);
        self
    }

    pub fn availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }
}

/// Partial update for an officer record.
///
/// The fields here are the full allow-list of externally mutable officer
/// state. The load counters are deliberately absent: they change only
/// through `adjust_load` inside an assignment, resolution or reopen
/// transaction.
#[derive(Debug, Clone, Default)]
pub struct OfficerPatch {
    pub department: Option<String>,
    pub designation: Option<String>,
    pub localities: Option<Vec<String>>,
    pub availability: Option<Availability>,
}

impl OfficerPatch {
    /// True if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.department.is_none()
            && self.designation.is_none()
            && self.localities.is_none()
            && self.availability.is_none()
    }
}
