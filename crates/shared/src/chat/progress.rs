use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use super::session::{CycleId, SessionState, lock_session};

pub const DEFAULT_EXECUTING_DELAY_MS: u64 = 1_500;
pub const DEFAULT_VERIFYING_DELAY_MS: u64 = 3_500;

/// Cosmetic progress indicator. It never reflects real backend progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressStage {
    #[default]
    Idle,
    Planning,
    Executing,
    Verifying,
}

impl ProgressStage {
    pub const ACTIVE: [Self; 3] = [Self::Planning, Self::Executing, Self::Verifying];

    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Verifying => "verifying",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Planning => "Planner",
            Self::Executing => "Executor",
            Self::Verifying => "Verifier",
        }
    }

    pub const fn caption(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Planning => "Designing logical flow",
            Self::Executing => "Fetching verified data",
            Self::Verifying => "Validating integrity",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delays measured from cycle start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTimings {
    pub executing_after: Duration,
    pub verifying_after: Duration,
}

impl Default for ProgressTimings {
    fn default() -> Self {
        Self {
            executing_after: Duration::from_millis(DEFAULT_EXECUTING_DELAY_MS),
            verifying_after: Duration::from_millis(DEFAULT_VERIFYING_DELAY_MS),
        }
    }
}

struct PendingTimers {
    cycle: CycleId,
    handles: Vec<AbortHandle>,
}

impl PendingTimers {
    fn abort(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

/// Drives the planning → executing → verifying indicator on fixed timers.
///
/// Every timer is tagged with the cycle that started it, and at most one
/// cycle's timers are pending at a time: starting a cycle aborts whatever is
/// left from the previous one. A timer that still fires after its cycle ended
/// is rejected by [`SessionState::advance_stage`].
pub struct ProgressSimulator {
    timings: ProgressTimings,
    pending: Option<PendingTimers>,
}

impl ProgressSimulator {
    pub fn new(timings: ProgressTimings) -> Self {
        Self {
            timings,
            pending: None,
        }
    }

    pub fn timings(&self) -> ProgressTimings {
        self.timings
    }

    /// Schedules the two stage transitions for `cycle`. The caller has
    /// already moved the session to `Planning`.
    pub fn start(&mut self, cycle: CycleId, session: &Arc<Mutex<SessionState>>) {
        self.cancel_all();

        let handles = [
            (ProgressStage::Executing, self.timings.executing_after),
            (ProgressStage::Verifying, self.timings.verifying_after),
        ]
        .into_iter()
        .map(|(stage, delay)| spawn_stage_timer(Arc::clone(session), cycle, stage, delay))
        .collect();

        self.pending = Some(PendingTimers { cycle, handles });
    }

    /// Cancels the timers of `cycle` if they are still the pending ones.
    pub fn stop(&mut self, cycle: CycleId) {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.cycle == cycle)
        {
            self.cancel_all();
        }
    }

    pub fn cancel_all(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(cycle = %pending.cycle, "cancelling pending progress timers");
            pending.abort();
        }
    }

    pub fn pending_cycle(&self) -> Option<CycleId> {
        self.pending.as_ref().map(|pending| pending.cycle)
    }
}

impl Drop for ProgressSimulator {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn spawn_stage_timer(
    session: Arc<Mutex<SessionState>>,
    cycle: CycleId,
    stage: ProgressStage,
    delay: Duration,
) -> AbortHandle {
    let deadline = Instant::now() + delay;
    tokio::spawn(async move {
        sleep_until(deadline).await;
        if !lock_session(&session).advance_stage(cycle, stage) {
            debug!(cycle = %cycle, stage = %stage, "stale progress timer ignored");
        }
    })
    .abort_handle()
}
