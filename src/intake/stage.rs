//! Conversation stage tracking: which stage the agent is in and how far along
//! the intake is.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// The stages of the guided intake conversation, in their fixed order.
///
/// trust_building → situation_discovery → lifestyle_discovery →
/// readiness_discovery → priorities_discovery → needs_matching →
/// info_sharing → schedule_visit → visit_transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TrustBuilding,
    SituationDiscovery,
    LifestyleDiscovery,
    ReadinessDiscovery,
    PrioritiesDiscovery,
    NeedsMatching,
    InfoSharing,
    ScheduleVisit,
    VisitTransition,
}

impl Stage {
    /// Every stage in conversation order.
    pub const ALL: [Stage; 9] = [
        Stage::TrustBuilding,
        Stage::SituationDiscovery,
        Stage::LifestyleDiscovery,
        Stage::ReadinessDiscovery,
        Stage::PrioritiesDiscovery,
        Stage::NeedsMatching,
        Stage::InfoSharing,
        Stage::ScheduleVisit,
        Stage::VisitTransition,
    ];

    /// Number of stages in the catalog.
    pub const COUNT: usize = Self::ALL.len();

    /// Map a raw backend label onto the catalog.
    ///
    /// Case-insensitive; whitespace runs are treated as a single `_`, so
    /// "Situation Discovery" and " SITUATION   DISCOVERY " both resolve to
    /// [`Stage::SituationDiscovery`]. Returns `None` for anything else.
    pub fn normalize(raw: &str) -> Option<Stage> {
        let folded = raw.trim().to_lowercase();
        let key = WHITESPACE_RUN.replace_all(&folded, "_");
        Self::ALL.into_iter().find(|stage| stage.as_str() == key)
    }

    /// Canonical snake_case name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrustBuilding => "trust_building",
            Self::SituationDiscovery => "situation_discovery",
            Self::LifestyleDiscovery => "lifestyle_discovery",
            Self::ReadinessDiscovery => "readiness_discovery",
            Self::PrioritiesDiscovery => "priorities_discovery",
            Self::NeedsMatching => "needs_matching",
            Self::InfoSharing => "info_sharing",
            Self::ScheduleVisit => "schedule_visit",
            Self::VisitTransition => "visit_transition",
        }
    }

    /// Short label shown in the progress panel.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TrustBuilding => "Building Trust",
            Self::SituationDiscovery => "Understanding You",
            Self::LifestyleDiscovery => "Your Lifestyle",
            Self::ReadinessDiscovery => "Your Readiness",
            Self::PrioritiesDiscovery => "Your Priorities",
            Self::NeedsMatching => "Needs Matching",
            Self::InfoSharing => "Info Sharing",
            Self::ScheduleVisit => "Schedule Visit",
            Self::VisitTransition => "Next Steps",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::TrustBuilding => "Setting the tone & earning trust",
            Self::SituationDiscovery => "Understanding your situation & motivations",
            Self::LifestyleDiscovery => "Understanding your loved one's lifestyle",
            Self::ReadinessDiscovery => "Gauging awareness & readiness",
            Self::PrioritiesDiscovery => "Understanding priorities in a community",
            Self::NeedsMatching => "Connecting priorities to the community",
            Self::InfoSharing => "Sharing information about the community",
            Self::ScheduleVisit => "Confirming contact information",
            Self::VisitTransition => "Transitioning to a visit",
        }
    }

    /// Zero-based position in the conversation order.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The following stage, if any.
    pub fn next(&self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::TrustBuilding
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-scoped stage progress.
///
/// Invariant: `current_stage` is never a member of `completed_stages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgressState {
    pub current_stage: Stage,
    pub completed_stages: BTreeSet<Stage>,
    /// Stage whose "new stage" notification has not been dismissed yet.
    pub pending_notification: Option<Stage>,
}

impl Default for StageProgressState {
    fn default() -> Self {
        Self {
            current_stage: Stage::default(),
            completed_stages: BTreeSet::new(),
            pending_notification: None,
        }
    }
}

impl StageProgressState {
    /// Move to `new_stage`. Returns `false` (and changes nothing) when the
    /// conversation is already in that stage.
    ///
    /// Stages are taken in whatever order the backend reports them; moving
    /// back to an earlier stage is allowed and logged.
    pub fn advance(&mut self, new_stage: Stage) -> bool {
        if new_stage == self.current_stage {
            return false;
        }

        if new_stage < self.current_stage {
            tracing::warn!(
                from = %self.current_stage,
                to = %new_stage,
                "Backend moved the conversation to an earlier stage"
            );
        }

        self.completed_stages.insert(self.current_stage);
        self.completed_stages.remove(&new_stage);
        self.current_stage = new_stage;
        self.pending_notification = Some(new_stage);
        true
    }

    /// Completion percentage: completed stages plus the one in progress,
    /// over the catalog size.
    pub fn progress(&self) -> f64 {
        let reached = self.completed_stages.len() + 1;
        let pct = reached as f64 / Stage::COUNT as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }

    /// Whether `stage` has been left behind.
    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed_stages.contains(&stage)
    }

    pub fn clear_notification(&mut self) {
        self.pending_notification = None;
    }
}
