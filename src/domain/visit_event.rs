//! Visit event model for asynchronous usage accounting.

use chrono::{DateTime, Utc};

/// A resolved redirect waiting to be counted.
///
/// Produced by [`crate::application::services::LinkService::redirect`] on an
/// authoritative hit and consumed by
/// [`crate::domain::visit_worker::run_visit_worker`]. Sending never blocks the
/// redirect: a full queue drops the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitEvent {
    pub link_id: i64,
    pub visited_at: DateTime<Utc>,
}

impl VisitEvent {
    pub fn new(link_id: i64) -> Self {
        Self {
            link_id,
            visited_at: Utc::now(),
        }
    }
}
