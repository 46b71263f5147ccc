//! Domain error taxonomy shared by the orchestration, selection, and audio layers.

use thiserror::Error;

use crate::fsm::EntityState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompanionError {
    /// The requested (from, to) pair is not in the transition table.
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition { from: EntityState, to: EntityState },

    /// A synthesis or playback result carried a superseded cancellation token.
    #[error("stale result for token {token} (live token {live})")]
    StaleResult { token: u64, live: u64 },

    #[error("speech synthesis failed: {0}")]
    SynthesisFailure(String),

    /// An optional collaborator is not wired; the feature it backs stays disabled.
    #[error("collaborator unavailable: {0}")]
    MissingCollaborator(&'static str),

    /// Low-priority speech refused because something else is already audible or queued.
    #[error("audio channel busy; low-priority speech dropped")]
    ResourceContention,
}
