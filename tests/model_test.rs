//! Unit tests for the domain model: status matrix, priority order, patches.

use chrono::Utc;
use nivaran_rs::model::*;

#[test]
fn assigner_owns_only_the_pending_edge() {
    use ComplaintStatus::*;
    assert!(Pending.can_transition_to(Assigned));
    assert!(!Pending.can_transition_to(InProgress));
    assert!(!Pending.can_transition_to(Resolved));
    assert!(!Pending.can_transition_to(Reopened));
    assert!(!Assigned.can_transition_to(Pending));
}

#[test]
fn lifecycle_edges() {
    use ComplaintStatus::*;
    assert!(Assigned.can_transition_to(InProgress));
    assert!(Assigned.can_transition_to(Resolved));
    assert!(InProgress.can_transition_to(Resolved));
    assert!(Resolved.can_transition_to(Closed));
    assert!(!Closed.can_transition_to(Resolved));
    assert!(!Resolved.can_transition_to(Assigned));
    assert!(!InProgress.can_transition_to(Closed));
}

#[test]
fn reopen_is_a_side_transition() {
    use ComplaintStatus::*;
    assert!(Resolved.can_transition_to(Reopened));
    assert!(Closed.can_transition_to(Reopened));
    assert!(Reopened.can_transition_to(InProgress));
    assert!(Reopened.can_transition_to(Resolved));
    assert!(!Assigned.can_transition_to(Reopened));
}

#[test]
fn reopened_counts_toward_pending_load() {
    use ComplaintStatus::*;
    assert!(Assigned.is_active_assignment());
    assert!(InProgress.is_active_assignment());
    assert!(Reopened.is_active_assignment());
    assert!(!Pending.is_active_assignment());
    assert!(!Resolved.is_active_assignment());

    assert!(Resolved.is_terminal());
    assert!(Closed.is_terminal());
    assert!(!Reopened.is_terminal());
}

#[test]
fn priority_drains_high_first() {
    assert!(Priority::High.rank() < Priority::Normal.rank());
    assert!(Priority::Normal.rank() < Priority::Low.rank());
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn status_strings_match_schema() {
    assert_eq!(ComplaintStatus::InProgress.to_string(), "in-progress");
    assert_eq!(
        "in-progress".parse::<ComplaintStatus>().unwrap(),
        ComplaintStatus::InProgress
    );
    assert_eq!(Availability::OnLeave.to_string(), "on-leave");
    assert_eq!(
        "on-leave".parse::<Availability>().unwrap(),
        Availability::OnLeave
    );
    assert_eq!(QueueStatus::Queued.to_string(), "queued");
    assert!("urgent".parse::<Priority>().is_err());
    assert!("open".parse::<ComplaintStatus>().is_err());
}

#[test]
fn empty_patch_changes_nothing() {
    assert!(OfficerPatch::default().is_empty());

    let patch = OfficerPatch {
        availability: Some(Availability::Busy),
        ..Default::default()
    };
    assert!(!patch.is_empty());
}

#[test]
fn officer_serves_exact_locality_only() {
    let now = Utc::now();
    let officer = Officer {
        id: OfficerId::new(),
        name: "A. Sharma".to_string(),
        department: "Sanitation".to_string(),
        designation: "Field Officer".to_string(),
        email: "a.sharma@example.gov.in".to_string(),
        phone: String::new(),
        localities: vec!["110001".to_string()],
        availability: Availability::Available,
        availability_reason: None,
        pending_count: 0,
        solved_count: 0,
        created_at: now,
        updated_at: now,
    };

    assert!(officer.serves("110001"));
    // "1100010" starts with a served key; it still must not match.
    assert!(!officer.serves("1100010"));
    assert!(!officer.serves("11000"));
}
