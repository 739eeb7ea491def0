use std::fmt;

use candidate_filter::Candidate;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Phase of the confirmation protocol that can run out of time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Submission,
    SecondaryConfirmation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Submission => f.write_str("submission"),
            Phase::SecondaryConfirmation => f.write_str("secondary confirmation"),
        }
    }
}

/// Recognized business failure.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoSeat,
    /// The page showed an error phrase.
    Rejected(String),
    SubmitUnavailable,
    /// The booking task died before reaching a verdict.
    Crashed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NoSeat => f.write_str("no seat available"),
            FailureKind::Rejected(phrase) => write!(f, "rejected ({phrase})"),
            FailureKind::SubmitUnavailable => f.write_str("submit button unavailable"),
            FailureKind::Crashed => f.write_str("booking task crashed"),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    #[default]
    Idle,
    ScheduledWait {
        nominal: DateTime<FixedOffset>,
        start_at: DateTime<FixedOffset>,
    },
    Polling,
    Selected {
        train_no: String,
    },
    ConfirmFlow,
    Success,
    Failed {
        reason: FailureKind,
    },
    TimedOut {
        phase: Phase,
    },
    Stopped,
}

impl EngineState {
    /// Something is scheduled or running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            EngineState::ScheduledWait { .. }
                | EngineState::Polling
                | EngineState::Selected { .. }
                | EngineState::ConfirmFlow
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineState::Success
                | EngineState::Failed { .. }
                | EngineState::TimedOut { .. }
                | EngineState::Stopped
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::ScheduledWait { .. } => "scheduled_wait",
            EngineState::Polling => "polling",
            EngineState::Selected { .. } => "selected",
            EngineState::ConfirmFlow => "confirm_flow",
            EngineState::Success => "success",
            EngineState::Failed { .. } => "failed",
            EngineState::TimedOut { .. } => "timed_out",
            EngineState::Stopped => "stopped",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    /// A candidate was clicked; the page is expected to navigate.
    Selected(Candidate),
    /// The attempt ceiling was reached without a candidate.
    Exhausted { attempts: u32 },
    Cancelled,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfirmOutcome {
    Success,
    Failed(FailureKind),
    TimedOut(Phase),
    Cancelled,
}

impl ConfirmOutcome {
    pub fn into_state(self) -> Option<EngineState> {
        match self {
            ConfirmOutcome::Success => Some(EngineState::Success),
            ConfirmOutcome::Failed(reason) => Some(EngineState::Failed { reason }),
            ConfirmOutcome::TimedOut(phase) => Some(EngineState::TimedOut { phase }),
            ConfirmOutcome::Cancelled => None,
        }
    }
}
