//! Intake core: stage tracking, transcript extraction and visit detection.
//!
//! The agent labels each reply with the stage of the conversation it is in
//! and records question/answer pairs into a transcript record on the
//! backend. This module turns those two feeds into stage progress, a
//! structured intake form and a one-time "visit scheduled" signal. Nothing
//! here does I/O; see [`crate::driver`] for the loop that feeds it.

pub mod catalog;
pub mod completion;
pub mod extractor;
pub mod model;
pub mod session;
pub mod stage;
pub mod transcript;

pub use completion::{CompletionSignal, CompletionState};
pub use model::{AwareLooking, ContactMethod, FormUpdate, IntakeField, IntakeForm};
pub use session::{IntakeSession, SessionStatus, SnapshotOutcome, StageDecision};
pub use stage::{Stage, StageProgressState};
pub use transcript::{Category, ContactInfo, DiscoveryEntry, TranscriptRecord, TranscriptSnapshot, VisitInfo};
