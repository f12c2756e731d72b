//! The resumable harvest loop.
//!
//! A run loads the checkpoint, replays `position` advances to bring the live source back
//! to where the previous run stopped, harvests the page it lands on, then alternates
//! advance, extract, merge and save until the termination policy or a hard failure ends
//! it. The checkpoint for step `k` is on disk before step `k + 1` is attempted.
//!
//! Resume caveat: fast-forward replays advances without checking that they land on the
//! same content as before. If the source reorders its listing between runs, a resumed
//! run may skip or re-see items.

use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use harvester_core::{
    update, Backoff, BackoffController, BackoffSettings, DelayKind, HarvestState, ItemRegistry,
    Msg, StopReason, TerminationPolicy,
};
use tokio_util::sync::CancellationToken;

use crate::source::{Advancer, Extractor};
use crate::store::CheckpointStore;
use crate::{AdvanceError, FailureKind, HarvestError, RunOutcome, RunSummary};

#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub policy: TerminationPolicy,
    pub backoff: BackoffSettings,
    /// Attempts per advance (and per open) before the step counts as failed.
    pub max_attempts: u32,
    /// Upper bound on a single advance call.
    pub advance_timeout: Duration,
    /// Log a progress report every this many steps; 0 disables it.
    pub progress_interval: u64,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            policy: TerminationPolicy::default(),
            backoff: BackoffSettings::default(),
            max_attempts: 3,
            advance_timeout: Duration::from_secs(30),
            progress_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Open,
    Advance,
}

enum AttemptError {
    Exhausted { attempts: u32, cause: AdvanceError },
    Cancelled,
}

/// Where the main phase ended, and whether the source still matches the checkpoint.
struct PhaseEnd {
    state: HarvestState,
    outcome: RunOutcome,
    in_sync: bool,
}

pub struct Harvester<A, E> {
    advancer: A,
    extractor: E,
    store: CheckpointStore,
    settings: HarvestSettings,
    backoff: Box<dyn Backoff>,
    cancel: CancellationToken,
}

impl<A: Advancer, E: Extractor> Harvester<A, E> {
    pub fn new(advancer: A, extractor: E, store: CheckpointStore, settings: HarvestSettings) -> Self {
        let backoff = Box::new(BackoffController::new(settings.backoff.clone()));
        Self {
            advancer,
            extractor,
            store,
            settings,
            backoff,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that requests a cooperative shutdown when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until the policy stops the harvest or a failure halts it.
    ///
    /// The advancer is closed before this returns, whatever the outcome.
    pub async fn run(&mut self) -> RunSummary {
        let started = Instant::now();
        let checkpoint = self.store.load();
        let mut registry = ItemRegistry::from_items(checkpoint.items.iter().cloned());
        let initial_items = registry.len();
        let state = HarvestState::from_checkpoint(&checkpoint);
        let mut persistence_failures = 0;

        let end = self
            .drive(state, &mut registry, started, &mut persistence_failures)
            .await;

        if end.in_sync {
            engine_info!("Final harvest at position {}", end.state.position());
            let new_items = registry.merge(self.extractor.extract().await);
            if new_items > 0 {
                engine_info!("Final harvest found {} new items", new_items);
            }
            self.persist(&end.state, &registry, &mut persistence_failures);
        }

        self.advancer.close().await;

        let summary = RunSummary {
            outcome: end.outcome,
            position: end.state.position(),
            total_items: registry.len(),
            new_items: registry.len().saturating_sub(initial_items),
            failed_positions: end.state.failed_positions().to_vec(),
            persistence_failures,
            runtime: started.elapsed(),
        };
        log_summary(&summary);
        summary
    }

    async fn drive(
        &mut self,
        state: HarvestState,
        registry: &mut ItemRegistry,
        started: Instant,
        persistence_failures: &mut u32,
    ) -> PhaseEnd {
        match self.attempt(Action::Open, 0).await {
            Ok(()) => {}
            Err(AttemptError::Cancelled) => {
                return PhaseEnd::stopped(state, StopReason::Cancelled, false);
            }
            Err(AttemptError::Exhausted { attempts, cause }) => {
                engine_error!("Failed to open the source: {}", cause);
                return PhaseEnd::halted(state, HarvestError::Session { attempts, cause }, false);
            }
        }

        let target = state.position();
        if let Err((reached, err)) = self.fast_forward(target).await {
            return match err {
                AttemptError::Cancelled => {
                    engine_warn!(
                        "Shutdown requested during fast-forward at {}/{}; checkpoint left at {}",
                        reached,
                        target,
                        target
                    );
                    PhaseEnd::stopped(state, StopReason::Cancelled, false)
                }
                AttemptError::Exhausted { cause, .. } => {
                    engine_error!(
                        "Fast-forward failed after {} of {} positions: {}; checkpoint left at {}",
                        reached,
                        target,
                        cause,
                        target
                    );
                    PhaseEnd::halted(
                        state,
                        HarvestError::FastForward {
                            reached,
                            target,
                            cause,
                        },
                        false,
                    )
                }
            };
        }

        self.harvest_loop(state, registry, started, persistence_failures)
            .await
    }

    async fn harvest_loop(
        &mut self,
        mut state: HarvestState,
        registry: &mut ItemRegistry,
        started: Instant,
        persistence_failures: &mut u32,
    ) -> PhaseEnd {
        engine_info!("Harvesting current page at position {}", state.position());
        let new_items = registry.merge(self.extractor.extract().await);
        engine_info!(
            "Harvested {} new items | Total: {}",
            new_items,
            registry.len()
        );
        self.persist(&state, registry, persistence_failures);

        engine_info!(
            "Starting advance loop (target: {} steps)",
            self.settings.policy.max_steps
        );
        loop {
            if let Some(reason) = self.check_policy(&state, started) {
                log_stop(reason, &state, &self.settings.policy);
                return PhaseEnd::stopped(state, reason, true);
            }

            let next = state.position() + 1;
            match self.attempt(Action::Advance, next).await {
                Ok(()) => {}
                Err(AttemptError::Cancelled) => {
                    engine_warn!("Shutdown requested before position {}", next);
                    return PhaseEnd::stopped(state, StopReason::Cancelled, true);
                }
                Err(AttemptError::Exhausted { attempts, cause }) => {
                    engine_error!(
                        "Advance to position {} failed after {} attempts; stopping",
                        next,
                        attempts
                    );
                    state = update(state, Msg::StepFailed);
                    self.persist(&state, registry, persistence_failures);
                    let err = HarvestError::StepFailed {
                        position: next,
                        attempts,
                        cause,
                    };
                    return PhaseEnd::halted(state, err, true);
                }
            }

            let new_items = registry.merge(self.extractor.extract().await);
            state = update(state, Msg::StepHarvested { new_items });
            if new_items == 0 {
                engine_warn!(
                    "Step {}: no new items | Consecutive: {}/{}",
                    state.position(),
                    state.consecutive_no_new(),
                    self.settings.policy.max_consecutive_no_new
                );
            } else {
                engine_info!(
                    "Step {}: harvested {} new items | Total: {}",
                    state.position(),
                    new_items,
                    registry.len()
                );
            }
            self.persist(&state, registry, persistence_failures);
            self.report_progress(&state, registry, started);

            if self.check_policy(&state, started).is_none() {
                // A cancelled pause falls through to the policy check at the top.
                self.pause(DelayKind::Normal).await;
            }
        }
    }

    /// Replay `target` advances without harvesting. On failure, reports how many landed.
    async fn fast_forward(&mut self, target: u64) -> Result<(), (u64, AttemptError)> {
        if target == 0 {
            return Ok(());
        }
        engine_info!(
            "Resuming: fast-forwarding through {} positions without harvesting",
            target
        );
        for step in 1..=target {
            self.attempt(Action::Advance, step)
                .await
                .map_err(|err| (step - 1, err))?;
            if self.settings.progress_interval > 0 && step % self.settings.progress_interval == 0 {
                engine_info!("Fast-forwarded {}/{} positions", step, target);
            }
            if step < target && !self.pause(DelayKind::FastForward).await {
                return Err((step, AttemptError::Cancelled));
            }
        }
        engine_info!("Reached position {}; resuming harvest", target);
        Ok(())
    }

    /// Run one open/advance with retries. Each failed attempt except the last waits out a
    /// backoff chosen by the failure kind.
    async fn attempt(&mut self, action: Action, position: u64) -> Result<(), AttemptError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            if self.cancel.is_cancelled() {
                return Err(AttemptError::Cancelled);
            }

            let timeout = self.settings.advance_timeout;
            let advancer = &mut self.advancer;
            let call = async move {
                match action {
                    Action::Open => advancer.open().await,
                    Action::Advance => advancer.advance().await,
                }
            };
            let cause = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) => err,
                Err(_) => AdvanceError::new(
                    FailureKind::Timeout,
                    format!("no response within {:.1}s", timeout.as_secs_f64()),
                ),
            };

            engine_warn!(
                "{:?} attempt {}/{} for position {} failed: {}",
                action,
                attempt,
                max_attempts,
                position,
                cause
            );
            if attempt >= max_attempts {
                return Err(AttemptError::Exhausted {
                    attempts: attempt,
                    cause,
                });
            }

            let kind = if cause.is_overload() {
                DelayKind::ServerOverload
            } else {
                DelayKind::TransientError
            };
            if !self.pause(kind).await {
                return Err(AttemptError::Cancelled);
            }
            attempt += 1;
        }
    }

    /// Sleep for the backoff delay of `kind`. Returns `false` if shutdown was requested.
    async fn pause(&self, kind: DelayKind) -> bool {
        let delay = self.backoff.next_delay(kind);
        if !delay.is_zero() {
            engine_debug!("Waiting {:.1}s ({:?})", delay.as_secs_f64(), kind);
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => !self.cancel.is_cancelled(),
        }
    }

    fn check_policy(&self, state: &HarvestState, started: Instant) -> Option<StopReason> {
        let input = state.policy_input(started.elapsed(), self.cancel.is_cancelled());
        self.settings.policy.should_stop(&input)
    }

    fn persist(&self, state: &HarvestState, registry: &ItemRegistry, failures: &mut u32) {
        if let Err(err) = self.store.save_progress(state, registry) {
            *failures += 1;
            engine_error!(
                "Failed to save progress at position {}: {}; a crash now would resume from an older checkpoint",
                state.position(),
                err
            );
        }
    }

    fn report_progress(&self, state: &HarvestState, registry: &ItemRegistry, started: Instant) {
        let interval = self.settings.progress_interval;
        if interval == 0 || state.position() % interval != 0 {
            return;
        }
        engine_info!(
            "Progress: step {}/{} | items {} | runtime {:.1} min",
            state.position(),
            self.settings.policy.max_steps,
            registry.len(),
            started.elapsed().as_secs_f64() / 60.0
        );
    }
}

impl PhaseEnd {
    fn stopped(state: HarvestState, reason: StopReason, in_sync: bool) -> Self {
        Self {
            state: update(state, Msg::Stop(reason)),
            outcome: RunOutcome::Stopped(reason),
            in_sync,
        }
    }

    fn halted(state: HarvestState, err: HarvestError, in_sync: bool) -> Self {
        Self {
            state,
            outcome: RunOutcome::Halted(err),
            in_sync,
        }
    }
}

fn log_stop(reason: StopReason, state: &HarvestState, policy: &TerminationPolicy) {
    match reason {
        StopReason::Cancelled => engine_warn!("Shutdown requested; saving and exiting"),
        StopReason::RuntimeExceeded => engine_warn!(
            "Maximum runtime of {:.1} h exceeded; saving and exiting",
            policy.max_runtime.as_secs_f64() / 3600.0
        ),
        StopReason::Exhausted => engine_info!(
            "Reached {} consecutive steps with no new items; source exhausted",
            state.consecutive_no_new()
        ),
        StopReason::TargetReached => {
            engine_info!("Reached target of {} steps", policy.max_steps)
        }
    }
}

fn log_summary(summary: &RunSummary) {
    engine_info!("Run finished ({})", summary.outcome);
    engine_info!("Position: {}", summary.position);
    engine_info!(
        "Items: {} total, {} new this run",
        summary.total_items,
        summary.new_items
    );
    engine_info!("Runtime: {:.1} min", summary.runtime.as_secs_f64() / 60.0);
    if !summary.failed_positions.is_empty() {
        engine_warn!("Failed positions: {:?}", summary.failed_positions);
    }
    if summary.persistence_failures > 0 {
        engine_warn!(
            "{} saves failed during this run; the checkpoint may lag the source",
            summary.persistence_failures
        );
    }
}
