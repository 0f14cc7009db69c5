use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::conversation::{ConversationStore, Turn};
use super::progress::ProgressStage;
use crate::extract::extract_turn_payload;
use crate::models::{ChatRequest, ChatResponse};

/// Identity of one submit cycle. Strictly increasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(u64);

impl CycleId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyQuery,
    InFlight,
}

impl SubmitRejection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::InFlight => "in_flight",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleStart {
    pub cycle: CycleId,
    pub request: ChatRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleSettlement {
    Completed,
    Failed,
    /// The cycle was no longer current (a reset superseded it); nothing changed.
    Superseded,
}

/// The full envelope of the most recently completed cycle.
#[derive(Debug, Clone)]
pub struct LatestEnvelope {
    pub cycle: CycleId,
    pub query: String,
    pub response: ChatResponse,
    pub received_at: DateTime<Utc>,
}

/// All mutable client state of one chat session.
///
/// `active_cycle` doubles as the in-flight flag: it is `Some` exactly while a
/// cycle owns the stage, and only that cycle may settle it.
pub struct SessionState {
    conversation: ConversationStore,
    latest: Option<LatestEnvelope>,
    stage: ProgressStage,
    active_cycle: Option<CycleId>,
    input_text: String,
    next_cycle: u64,
    stage_tx: watch::Sender<ProgressStage>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (stage_tx, _) = watch::channel(ProgressStage::Idle);
        Self {
            conversation: ConversationStore::new(),
            latest: None,
            stage: ProgressStage::Idle,
            active_cycle: None,
            input_text: String::new(),
            next_cycle: 1,
            stage_tx,
        }
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    pub fn latest_envelope(&self) -> Option<&LatestEnvelope> {
        self.latest.as_ref()
    }

    pub fn stage(&self) -> ProgressStage {
        self.stage
    }

    pub fn in_flight(&self) -> bool {
        self.active_cycle.is_some()
    }

    pub fn active_cycle(&self) -> Option<CycleId> {
        self.active_cycle
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn subscribe_stage(&self) -> watch::Receiver<ProgressStage> {
        self.stage_tx.subscribe()
    }

    /// Replaces the draft query. The input is locked while a cycle is in
    /// flight; returns whether the text was accepted.
    pub fn set_input(&mut self, text: impl Into<String>) -> bool {
        if self.in_flight() {
            return false;
        }
        self.input_text = text.into();
        true
    }

    /// Validates the draft and, if accepted, claims the in-flight flag for a new
    /// cycle and moves the indicator to `Planning`.
    pub fn begin_cycle(&mut self) -> Result<CycleStart, SubmitRejection> {
        if self.in_flight() {
            return Err(SubmitRejection::InFlight);
        }
        if self.input_text.trim().is_empty() {
            return Err(SubmitRejection::EmptyQuery);
        }

        let cycle = CycleId(self.next_cycle);
        self.next_cycle += 1;
        self.active_cycle = Some(cycle);
        self.latest = None;
        self.set_stage(ProgressStage::Planning);

        Ok(CycleStart {
            cycle,
            request: ChatRequest {
                query: self.input_text.clone(),
                history: self.conversation.outbound_history(),
            },
        })
    }

    /// Applies a simulated stage transition if `cycle` still owns the stage.
    pub fn advance_stage(&mut self, cycle: CycleId, stage: ProgressStage) -> bool {
        if self.active_cycle != Some(cycle) || !stage.is_active() {
            return false;
        }
        self.set_stage(stage);
        true
    }

    pub fn complete_cycle(
        &mut self,
        cycle: CycleId,
        query: String,
        response: ChatResponse,
        received_at: DateTime<Utc>,
    ) -> CycleSettlement {
        if self.active_cycle != Some(cycle) {
            return CycleSettlement::Superseded;
        }

        let payload = extract_turn_payload(response.results.as_deref());
        self.conversation
            .append_exchange(query.clone(), response.verified_output.clone(), payload);
        self.latest = Some(LatestEnvelope {
            cycle,
            query,
            response,
            received_at,
        });
        self.input_text.clear();
        self.release(cycle);
        CycleSettlement::Completed
    }

    /// Ends `cycle` without touching the transcript; the draft is kept for a
    /// manual retry.
    pub fn fail_cycle(&mut self, cycle: CycleId) -> CycleSettlement {
        if self.active_cycle != Some(cycle) {
            return CycleSettlement::Superseded;
        }
        self.release(cycle);
        CycleSettlement::Failed
    }

    /// Clears everything. An in-flight cycle is superseded and returned.
    pub fn reset(&mut self) -> Option<CycleId> {
        let superseded = self.active_cycle.take();
        self.conversation.reset();
        self.latest = None;
        self.input_text.clear();
        self.set_stage(ProgressStage::Idle);
        superseded
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            turns: self.conversation.turns().to_vec(),
            latest: self.latest.clone(),
            stage: self.stage,
            in_flight: self.in_flight(),
            input_text: self.input_text.clone(),
        }
    }

    fn release(&mut self, cycle: CycleId) {
        debug_assert_eq!(self.active_cycle, Some(cycle));
        self.active_cycle = None;
        self.set_stage(ProgressStage::Idle);
    }

    fn set_stage(&mut self, stage: ProgressStage) {
        self.stage = stage;
        self.stage_tx.send_replace(stage);
    }
}

/// Owned copy of the session for rendering.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub turns: Vec<Turn>,
    pub latest: Option<LatestEnvelope>,
    pub stage: ProgressStage,
    pub in_flight: bool,
    pub input_text: String,
}

pub(crate) fn lock_session(session: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    match session.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
