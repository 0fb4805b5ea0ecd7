//! Run state tracking for a transformation run
//!
//! A run moves strictly forward through
//! `Disconnected -> Connected -> Stage1Built -> Stage2Built`. `Failed` can be
//! entered from any non-terminal state. Nothing ever moves backwards: a
//! completed stage's table is never rolled back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No store connection yet
    Disconnected,
    /// Store connection established
    Connected,
    /// Intermediate table committed
    Stage1Built,
    /// Fact table committed
    Stage2Built,
    /// A step failed; the run is over
    Failed,
}

impl PipelineState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Stage2Built | PipelineState::Failed)
    }

    /// The single forward successor, if any
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Disconnected => Some(PipelineState::Connected),
            PipelineState::Connected => Some(PipelineState::Stage1Built),
            PipelineState::Stage1Built => Some(PipelineState::Stage2Built),
            PipelineState::Stage2Built | PipelineState::Failed => None,
        }
    }

    /// Whether `self -> to` is a legal transition
    pub fn can_transition_to(self, to: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == PipelineState::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Disconnected => "disconnected",
            PipelineState::Connected => "connected",
            PipelineState::Stage1Built => "stage1_built",
            PipelineState::Stage2Built => "stage2_built",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A recorded state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: PipelineState,
    pub to: PipelineState,
    pub at: DateTime<Utc>,
}

/// State of a transformation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Short identifier for this run, used in log lines
    pub run_id: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Current state
    state: PipelineState,

    /// Every transition taken so far, oldest first
    transitions: Vec<Transition>,

    /// Error message when the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

impl RunState {
    /// Create a new run state in `Disconnected`
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string()[..8].to_string(),
            started_at: Utc::now(),
            state: PipelineState::Disconnected,
            transitions: Vec::new(),
            failure: None,
        }
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Transitions taken so far
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Failure message, when the run ended in `Failed`
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Move to `to`, rejecting anything other than the forward successor.
    ///
    /// Use [`fail`](Self::fail) to enter `Failed`.
    pub fn advance(&mut self, to: PipelineState) -> CoreResult<()> {
        if to == PipelineState::Failed || !self.state.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.record(to);
        Ok(())
    }

    /// Enter `Failed` with an error message
    pub fn fail(&mut self, message: impl Into<String>) -> CoreResult<()> {
        if !self.state.can_transition_to(PipelineState::Failed) {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: PipelineState::Failed.to_string(),
            });
        }
        self.failure = Some(message.into());
        self.record(PipelineState::Failed);
        Ok(())
    }

    fn record(&mut self, to: PipelineState) {
        log::debug!("run {}: {} -> {}", self.run_id, self.state, to);
        self.transitions.push(Transition {
            from: self.state,
            to,
            at: Utc::now(),
        });
        self.state = to;
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "run_state_test.rs"]
mod tests;
