//! Assignment span helpers.
//!
//! Provides span creation and state-transition recording for complaints
//! flowing through the assigner, on both the submit and sweep paths.

use tracing::Span;

use crate::model::ComplaintId;

/// Start a span for an assignment attempt.
///
/// The `complaint.state` field is declared empty and can be updated via
/// [`record_state_transition`].
pub fn start_assign_span(path: &str, complaint_id: &ComplaintId, locality: &str) -> Span {
    tracing::info_span!(
        "assign.attempt",
        "assign.path" = path,
        "complaint.id" = %complaint_id,
        "complaint.locality" = locality,
        "complaint.state" = tracing::field::Empty,
    )
}

/// Record a state transition event on the current span.
///
/// Emits a tracing `info` event scoped to the given span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
