mod controller;
mod conversation;
mod integrity_log;
mod progress;
mod session;

pub use controller::{RequestController, SubmitOutcome};
pub use conversation::{ConversationStore, Turn};
pub use integrity_log::{
    EMPTY_LOG_MESSAGE, EntryDetail, IntegrityLogEntry, IntegrityLogReport, IntegrityLogView,
    NO_PLAN_MESSAGE,
};
pub use progress::{
    DEFAULT_EXECUTING_DELAY_MS, DEFAULT_VERIFYING_DELAY_MS, ProgressSimulator, ProgressStage,
    ProgressTimings,
};
pub use session::{
    CycleId, CycleSettlement, CycleStart, LatestEnvelope, SessionSnapshot, SessionState,
    SubmitRejection,
};
