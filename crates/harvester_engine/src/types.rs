use std::fmt;
use std::time::Duration;

use harvester_core::StopReason;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The source is throttling; recover with the longer overload wait.
    ServerOverload,
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ServerOverload => write!(f, "server overload"),
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Other => write!(f, "advance failed"),
        }
    }
}

/// One failed attempt to open the source or reveal the next page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct AdvanceError {
    pub kind: FailureKind,
    pub message: String,
}

impl AdvanceError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn overload(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ServerOverload, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }

    pub fn is_overload(&self) -> bool {
        self.kind == FailureKind::ServerOverload
    }
}

/// Run-halting failures. Prior progress is kept in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarvestError {
    #[error("could not open the source after {attempts} attempts: {cause}")]
    Session { attempts: u32, cause: AdvanceError },
    #[error("fast-forward reached {reached} of {target} positions: {cause}")]
    FastForward {
        reached: u64,
        target: u64,
        cause: AdvanceError,
    },
    #[error("advance to position {position} failed after {attempts} attempts: {cause}")]
    StepFailed {
        position: u64,
        attempts: u32,
        cause: AdvanceError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The termination policy ended the run.
    Stopped(StopReason),
    /// A failure the loop refuses to skip ended the run.
    Halted(HarvestError),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Stopped(reason) => write!(f, "stopped: {reason}"),
            RunOutcome::Halted(err) => write!(f, "halted: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub position: u64,
    pub total_items: usize,
    /// Items first seen during this run.
    pub new_items: usize,
    pub failed_positions: Vec<u64>,
    /// Saves that failed; resume safety for those steps is not guaranteed.
    pub persistence_failures: u32,
    pub runtime: Duration,
}

impl RunSummary {
    pub fn stop_reason(&self) -> Option<StopReason> {
        match &self.outcome {
            RunOutcome::Stopped(reason) => Some(*reason),
            RunOutcome::Halted(_) => None,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Halted(_))
    }
}
