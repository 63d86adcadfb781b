//! IntakeSession: the session-scoped state the stage tracker, extractor and
//! completion detector operate on.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::completion::CompletionState;
use super::extractor;
use super::model::{IntakeField, IntakeForm};
use super::stage::{Stage, StageProgressState};
use super::transcript::TranscriptSnapshot;

/// What one stage label did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDecision {
    /// The conversation moved to a new stage.
    Advanced { from: Stage, to: Stage },
    /// The label named the stage the conversation is already in.
    Unchanged(Stage),
    /// No label, or a label outside the catalog.
    Unrecognized,
}

/// What one transcript snapshot did to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    /// Form fields whose value changed.
    pub changed_fields: Vec<IntakeField>,
    /// Set the one time a confirmed visit is first seen.
    pub visit_confirmed: Option<String>,
}

/// Session state for one conversation. Lives until the user resets the
/// session.
#[derive(Debug, Clone)]
pub struct IntakeSession {
    stages: StageProgressState,
    completion: CompletionState,
    form: IntakeForm,
    stage_not_recognized: bool,
    notification_raised_at: Option<DateTime<Utc>>,
    notification_display: TimeDelta,
}

impl IntakeSession {
    pub fn new(notification_display: std::time::Duration) -> Self {
        Self {
            stages: StageProgressState::default(),
            completion: CompletionState::default(),
            form: IntakeForm::default(),
            stage_not_recognized: false,
            notification_raised_at: None,
            notification_display: TimeDelta::from_std(notification_display)
                .unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn stages(&self) -> &StageProgressState {
        &self.stages
    }

    pub fn current_stage(&self) -> Stage {
        self.stages.current_stage
    }

    pub fn progress(&self) -> f64 {
        self.stages.progress()
    }

    pub fn form(&self) -> &IntakeForm {
        &self.form
    }

    pub fn completion(&self) -> &CompletionState {
        &self.completion
    }

    /// Whether the last reply's stage label could not be recognized.
    pub fn stage_not_recognized(&self) -> bool {
        self.stage_not_recognized
    }

    pub fn pending_notification(&self) -> Option<Stage> {
        self.stages.pending_notification
    }

    /// Forget the previous exchange's "stage not recognized" verdict.
    pub fn clear_stage_flag(&mut self) {
        self.stage_not_recognized = false;
    }

    /// Apply the stage label of the last agent reply of an exchange.
    pub fn apply_stage_label(&mut self, label: Option<&str>, now: DateTime<Utc>) -> StageDecision {
        let Some(raw) = label else {
            debug!("Reply carried no stage label");
            self.stage_not_recognized = true;
            return StageDecision::Unrecognized;
        };

        let Some(stage) = Stage::normalize(raw) else {
            debug!(label = %raw, "Stage label not recognized");
            self.stage_not_recognized = true;
            return StageDecision::Unrecognized;
        };

        self.stage_not_recognized = false;
        let from = self.stages.current_stage;
        if !self.stages.advance(stage) {
            return StageDecision::Unchanged(stage);
        }

        self.notification_raised_at = Some(now);
        info!(
            %from,
            to = %stage,
            progress = self.stages.progress(),
            "Conversation moved to a new stage"
        );
        StageDecision::Advanced { from, to: stage }
    }

    /// Dismiss the stage notification once it has been visible for the
    /// configured interval. Returns `true` if it was dismissed.
    pub fn expire_notification(&mut self, now: DateTime<Utc>) -> bool {
        let Some(raised_at) = self.notification_raised_at else {
            return false;
        };
        if now - raised_at < self.notification_display {
            return false;
        }
        self.dismiss_notification();
        true
    }

    pub fn dismiss_notification(&mut self) {
        self.stages.clear_notification();
        self.notification_raised_at = None;
    }

    /// Re-run extraction and completion detection against a fresh snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &TranscriptSnapshot) -> SnapshotOutcome {
        let update = extractor::map(snapshot.record.as_ref(), snapshot.visit_info.as_ref());
        let changed_fields = self.form.merge(&update);
        if !changed_fields.is_empty() {
            debug!(fields = ?changed_fields, "Intake form updated from transcript");
        }

        let visit_confirmed = snapshot
            .record
            .as_ref()
            .and_then(|record| self.completion.observe(record));
        if let Some(ref time) = visit_confirmed {
            info!(time = %time, "Visit confirmed");
        }

        SnapshotOutcome {
            changed_fields,
            visit_confirmed,
        }
    }

    /// Manual edit from the form.
    pub fn set_field(&mut self, field: IntakeField, value: &str) {
        self.form.set_field(field, value);
    }

    /// Start over: stage progress, the completion latch, the recognition
    /// flag and the form's yes/no and contact-method selections.
    pub fn reset(&mut self) {
        self.stages = StageProgressState::default();
        self.completion.reset();
        self.form.clear_flags();
        self.stage_not_recognized = false;
        self.notification_raised_at = None;
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            current_stage: self.stages.current_stage,
            completed_stages: self.stages.completed_stages.iter().copied().collect(),
            progress: self.stages.progress(),
            stage_not_recognized: self.stage_not_recognized,
            visit_scheduled: self.completion.shown,
            scheduled_time: self.completion.scheduled_time.clone(),
        }
    }
}

/// Snapshot of the session for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub current_stage: Stage,
    pub completed_stages: Vec<Stage>,
    pub progress: f64,
    pub stage_not_recognized: bool,
    pub visit_scheduled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
}
