use std::fmt;
use std::time::Duration;

/// Why a run stopped. Listed in evaluation precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    RuntimeExceeded,
    Exhausted,
    TargetReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::RuntimeExceeded => write!(f, "runtime exceeded"),
            StopReason::Exhausted => write!(f, "source exhausted"),
            StopReason::TargetReached => write!(f, "target reached"),
        }
    }
}

/// Two-state run lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Running,
    Stopped(StopReason),
}

impl RunStatus {
    /// Transition to `Stopped`. A run that already stopped keeps its first reason.
    pub fn stop(self, reason: StopReason) -> RunStatus {
        match self {
            RunStatus::Running => RunStatus::Stopped(reason),
            stopped @ RunStatus::Stopped(_) => stopped,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, RunStatus::Stopped(_))
    }

    pub fn reason(&self) -> Option<StopReason> {
        match self {
            RunStatus::Running => None,
            RunStatus::Stopped(reason) => Some(*reason),
        }
    }
}

/// Observed values the policy is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInput {
    pub steps: u64,
    pub consecutive_no_new: u32,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Configured ceilings for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub max_steps: u64,
    pub max_consecutive_no_new: u32,
    pub max_runtime: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            max_steps: 15_627,
            max_consecutive_no_new: 5,
            max_runtime: Duration::from_secs(12 * 60 * 60),
        }
    }
}

impl TerminationPolicy {
    /// First matching rule wins: cancellation, runtime, exhaustion, target.
    pub fn should_stop(&self, input: &PolicyInput) -> Option<StopReason> {
        if input.cancelled {
            return Some(StopReason::Cancelled);
        }
        if input.elapsed > self.max_runtime {
            return Some(StopReason::RuntimeExceeded);
        }
        if input.consecutive_no_new >= self.max_consecutive_no_new {
            return Some(StopReason::Exhausted);
        }
        if input.steps >= self.max_steps {
            return Some(StopReason::TargetReached);
        }
        None
    }
}
