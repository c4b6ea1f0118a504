//! Adaptive Ability Estimator
//!
//! Contains:
//! - bank: item bank resolution to IRT parameters
//! - screening: Yes/No recognition phase with pseudoword correction
//! - selection: maximum-information item selection with exposure control
//! - session: the `screening → catRunning → done` state machine

pub mod bank;
pub mod screening;
pub mod selection;
pub mod session;

pub use bank::{rank_to_difficulty, resolve_bank, AssessmentItem, BankItem, ItemKind};
pub use screening::{ScreeningAnswer, ScreeningScore};
pub use selection::{select_next, Selection};
pub use session::{
    AssessmentResponse, AssessmentResult, AssessmentSession, AssessmentStage, CatState,
    CompletionReason, ResponsePhase, ScreeningState, StageKind, SubmitResult,
};
