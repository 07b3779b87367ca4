//! Job state machine
//!
//! ```text
//! in_progress ──► delivered ──► completed
//!      │              │
//!      └──────┬───────┘
//!             ▼
//!   cancelled / disputed
//! ```
//!
//! Only the forward path is driven by the API. Cancellation and dispute are
//! exits reserved for administrative tooling.

use crate::{JobStatus, RequestStatus, Result, TypesError};
use serde::{Deserialize, Serialize};

/// Prefix marking a job message as a delivery note
pub const DELIVERY_MESSAGE_PREFIX: &str = "📦 DELIVERY: ";

impl JobStatus {
    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (InProgress, Delivered)
                | (Delivered, Completed)
                | (InProgress, Cancelled)
                | (InProgress, Disputed)
                | (Delivered, Cancelled)
                | (Delivered, Disputed)
        )
    }

    /// Validate a transition, returning the new status
    pub fn transition_to(self, next: JobStatus) -> Result<JobStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TypesError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// Closed jobs accept no further messages
    pub fn is_closed(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Jobs whose price has left the client but not yet reached the provider
    pub fn holds_funds(self) -> bool {
        matches!(self, JobStatus::InProgress | JobStatus::Delivered)
    }
}

impl RequestStatus {
    /// Only open requests take proposals, can be accepted, or be cancelled
    pub fn is_open(self) -> bool {
        self == RequestStatus::Open
    }
}

/// The side an agent is on within a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRole {
    Client,
    Provider,
}

impl JobRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobRole::Client => "client",
            JobRole::Provider => "provider",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use JobStatus::*;

    #[test]
    fn test_forward_path() {
        assert_eq!(InProgress.transition_to(Delivered), Ok(Delivered));
        assert_eq!(Delivered.transition_to(Completed), Ok(Completed));
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!InProgress.can_transition_to(Completed));
        assert!(!Delivered.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Delivered));
        assert!(Completed.transition_to(Cancelled).is_err());
    }

    #[test]
    fn test_exits_only_from_open_states() {
        for exit in [Cancelled, Disputed] {
            assert!(InProgress.can_transition_to(exit));
            assert!(Delivered.can_transition_to(exit));
            assert!(!Completed.can_transition_to(exit));
        }
    }

    #[test]
    fn test_closed_states() {
        assert!(Completed.is_closed());
        assert!(Cancelled.is_closed());
        assert!(!Delivered.is_closed());
        assert!(!Disputed.is_closed());
    }

    #[test]
    fn test_funds_held_while_work_is_open() {
        assert!(InProgress.holds_funds());
        assert!(Delivered.holds_funds());
        assert!(!Completed.holds_funds());
    }
}
