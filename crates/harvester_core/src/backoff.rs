use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayKind {
    /// Pacing between two harvested steps.
    Normal,
    /// Pacing between replayed steps while resuming.
    FastForward,
    /// The source signalled it is overloaded.
    ServerOverload,
    /// A single attempt failed; retry the same step.
    TransientError,
}

/// Decides how long to wait before the next advance.
pub trait Backoff: Send + Sync {
    fn next_delay(&self, kind: DelayKind) -> Duration;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSettings {
    pub normal_min: Duration,
    pub normal_max: Duration,
    pub fast_forward_min: Duration,
    pub fast_forward_max: Duration,
    pub server_overload: Duration,
    pub transient_error: Duration,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            normal_min: Duration::from_secs(5),
            normal_max: Duration::from_secs(10),
            fast_forward_min: Duration::from_secs(1),
            fast_forward_max: Duration::from_secs(2),
            server_overload: Duration::from_secs(10),
            transient_error: Duration::from_secs(2),
        }
    }
}

impl BackoffSettings {
    /// Every delay zero. Used when pacing is handled elsewhere, and in tests.
    pub fn immediate() -> Self {
        Self {
            normal_min: Duration::ZERO,
            normal_max: Duration::ZERO,
            fast_forward_min: Duration::ZERO,
            fast_forward_max: Duration::ZERO,
            server_overload: Duration::ZERO,
            transient_error: Duration::ZERO,
        }
    }
}

/// Stateless controller: jittered windows for pacing, fixed waits for failures.
#[derive(Debug, Clone, Default)]
pub struct BackoffController {
    settings: BackoffSettings,
}

impl BackoffController {
    pub fn new(settings: BackoffSettings) -> Self {
        Self { settings }
    }
}

impl Backoff for BackoffController {
    fn next_delay(&self, kind: DelayKind) -> Duration {
        match kind {
            DelayKind::Normal => uniform(self.settings.normal_min, self.settings.normal_max),
            DelayKind::FastForward => uniform(
                self.settings.fast_forward_min,
                self.settings.fast_forward_max,
            ),
            DelayKind::ServerOverload => self.settings.server_overload,
            DelayKind::TransientError => self.settings.transient_error,
        }
    }
}

fn uniform(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    let secs = rand::thread_rng().gen_range(min.as_secs_f64()..=max.as_secs_f64());
    Duration::from_secs_f64(secs)
}
