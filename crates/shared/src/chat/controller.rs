use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::integrity_log::IntegrityLogView;
use super::progress::{ProgressSimulator, ProgressStage, ProgressTimings};
use super::session::{
    CycleId, CycleSettlement, SessionSnapshot, SessionState, SubmitRejection, lock_session,
};
use crate::backend::{ChatBackend, ChatBackendError};
use crate::models::HealthResponse;

#[derive(Debug)]
pub enum SubmitOutcome {
    Ignored(SubmitRejection),
    Completed { cycle: CycleId },
    Failed { cycle: CycleId, error: ChatBackendError },
    /// A reset superseded the cycle before the backend answered.
    Superseded { cycle: CycleId },
}

impl SubmitOutcome {
    pub fn cycle(&self) -> Option<CycleId> {
        match self {
            Self::Ignored(_) => None,
            Self::Completed { cycle } | Self::Failed { cycle, .. } | Self::Superseded { cycle } => {
                Some(*cycle)
            }
        }
    }
}

/// Owns the query/response cycle of one chat session.
///
/// Cheap to clone; clones share the session. At most one cycle is in flight:
/// a submit while another is pending is ignored, never queued.
pub struct RequestController<B> {
    inner: Arc<ControllerInner<B>>,
}

impl<B> Clone for RequestController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<B> {
    backend: B,
    session: Arc<Mutex<SessionState>>,
    progress: Mutex<ProgressSimulator>,
}

impl<B> RequestController<B>
where
    B: ChatBackend,
{
    pub fn new(backend: B, timings: ProgressTimings) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                backend,
                session: Arc::new(Mutex::new(SessionState::new())),
                progress: Mutex::new(ProgressSimulator::new(timings)),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn set_input(&self, text: impl Into<String>) -> bool {
        self.lock_session().set_input(text)
    }

    /// Submits the current draft.
    pub async fn submit(&self) -> SubmitOutcome {
        let start = match self.lock_session().begin_cycle() {
            Ok(start) => start,
            Err(rejection) => {
                debug!(reason = rejection.as_str(), "submission ignored");
                return SubmitOutcome::Ignored(rejection);
            }
        };
        let cycle = start.cycle;
        let query = start.request.query.clone();
        let mut guard = CycleGuard::new(self, cycle);

        self.lock_progress().start(cycle, &self.inner.session);
        debug!(cycle = %cycle, "chat cycle started");

        let result = self.inner.backend.send_chat(start.request).await;

        guard.disarm();
        self.lock_progress().stop(cycle);

        let mut session = self.lock_session();
        match result {
            Ok(response) => {
                let result_count = response.results().len();
                match session.complete_cycle(cycle, query, response, Utc::now()) {
                    CycleSettlement::Completed => {
                        info!(
                            cycle = %cycle,
                            result_count,
                            turns = session.conversation().len(),
                            "chat cycle completed"
                        );
                        SubmitOutcome::Completed { cycle }
                    }
                    _ => {
                        debug!(cycle = %cycle, "discarding response of superseded cycle");
                        SubmitOutcome::Superseded { cycle }
                    }
                }
            }
            Err(error) => match session.fail_cycle(cycle) {
                CycleSettlement::Failed => {
                    warn!(
                        cycle = %cycle,
                        error_kind = error.kind(),
                        "chat cycle failed: {error}"
                    );
                    SubmitOutcome::Failed { cycle, error }
                }
                _ => {
                    debug!(cycle = %cycle, "ignoring failure of superseded cycle: {error}");
                    SubmitOutcome::Superseded { cycle }
                }
            },
        }
    }

    /// Replaces the draft with `query` and submits it.
    pub async fn submit_query(&self, query: impl Into<String>) -> SubmitOutcome {
        if !self.set_input(query) {
            debug!(reason = SubmitRejection::InFlight.as_str(), "submission ignored");
            return SubmitOutcome::Ignored(SubmitRejection::InFlight);
        }
        self.submit().await
    }

    pub fn reset_conversation(&self) {
        self.lock_progress().cancel_all();
        if let Some(cycle) = self.lock_session().reset() {
            info!(cycle = %cycle, "conversation reset superseded in-flight cycle");
        } else {
            debug!("conversation reset");
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, ChatBackendError> {
        self.inner.backend.health().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock_session().snapshot()
    }

    pub fn integrity_log(&self) -> IntegrityLogView {
        IntegrityLogView::project(self.lock_session().latest_envelope())
    }

    pub fn stage(&self) -> ProgressStage {
        self.lock_session().stage()
    }

    pub fn in_flight(&self) -> bool {
        self.lock_session().in_flight()
    }

    pub fn subscribe_stage(&self) -> watch::Receiver<ProgressStage> {
        self.lock_session().subscribe_stage()
    }

    fn lock_session(&self) -> MutexGuard<'_, SessionState> {
        lock_session(&self.inner.session)
    }

    fn lock_progress(&self) -> MutexGuard<'_, ProgressSimulator> {
        match self.inner.progress.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Releases the in-flight flag if a submit future is dropped (or unwinds)
/// before the backend answers.
struct CycleGuard<'a, B: ChatBackend> {
    controller: &'a RequestController<B>,
    cycle: CycleId,
    armed: bool,
}

impl<'a, B: ChatBackend> CycleGuard<'a, B> {
    fn new(controller: &'a RequestController<B>, cycle: CycleId) -> Self {
        Self {
            controller,
            cycle,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<B: ChatBackend> Drop for CycleGuard<'_, B> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.controller.lock_progress().stop(self.cycle);
        if self.controller.lock_session().fail_cycle(self.cycle) == CycleSettlement::Failed {
            warn!(cycle = %self.cycle, "chat cycle abandoned before the backend answered");
        }
    }
}
