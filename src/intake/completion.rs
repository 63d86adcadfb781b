//! Visit-scheduled detection.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::{PENDING_CONFIRMATION, VISIT_TIME_QUESTION};
use super::transcript::TranscriptRecord;

/// Outcome of one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSignal {
    pub trigger: bool,
    /// The confirmed visit time, set only when `trigger` is true.
    pub time: Option<String>,
}

/// Whether the "visit scheduled" step has been shown this session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionState {
    pub shown: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
}

impl CompletionState {
    /// Evaluate a snapshot against this state and latch a positive signal.
    ///
    /// Returns the confirmed time the first time a confirmed visit shows up;
    /// `None` on every later call until [`CompletionState::reset`].
    pub fn observe(&mut self, record: &TranscriptRecord) -> Option<String> {
        let signal = evaluate(record, self.shown);
        if !signal.trigger {
            return None;
        }
        self.shown = true;
        self.scheduled_time = signal.time.clone();
        signal.time
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Check the visit-scheduling entries for a confirmed appointment.
///
/// Fires only if the visit-time question has been answered, the answer is
/// not a proposal still "pending confirmation", and the completion step
/// hasn't been shown yet.
pub fn evaluate(record: &TranscriptRecord, already_shown: bool) -> CompletionSignal {
    let Some(entry) = record
        .visit_scheduling
        .iter()
        .find(|e| e.question == VISIT_TIME_QUESTION && e.is_answered())
    else {
        return CompletionSignal::default();
    };

    if entry.answer.contains(PENDING_CONFIRMATION) {
        debug!(answer = %entry.answer, "Visit time proposed, pending confirmation");
        return CompletionSignal::default();
    }

    if already_shown {
        return CompletionSignal::default();
    }

    CompletionSignal {
        trigger: true,
        time: Some(entry.answer.clone()),
    }
}
