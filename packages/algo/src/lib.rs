//! # danci-learner-algo - learner model algorithms
//!
//! Pure Rust implementations of the learner model:
//!
//! - **Review Scheduler** - stability/difficulty spaced repetition
//! - **Placement Staircase** - cold-start ability estimate from easy/hard judgments
//! - **Adaptive Ability Estimator** - Yes/No screening followed by an IRT-based CAT
//!
//! ## Design
//!
//! - **Pure** - every operation takes explicit state and returns new state; no I/O
//! - **Serializable** - all state types are `serde` records the caller persists
//! - **Guarded** - preconditions are rejected with typed errors, numeric edge
//!   cases are epsilon-guarded instead of raising
//!
//! ## Modules
//!
//! - [`scheduler`] - review scheduling, memory state, due queue
//! - [`placement`] - staircase placement
//! - [`irt`] - response model, Fisher information, MAP update
//! - [`assessment`] - item bank, screening, selection, session state machine
//! - [`report`] - probability reports, vocabulary size, stratum coverage
//! - [`sanitize`] - numeric guards and input validation
//! - [`config`] - tunable parameters
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use danci_learner_algo::{MemoryParams, Rating, ReviewScheduler};
//!
//! let scheduler = ReviewScheduler::default();
//! let params = MemoryParams { stability: 2.0, difficulty: 5.0 };
//! let next = scheduler.update(params, Rating::Good, Utc::now()).unwrap();
//! assert_eq!(next.interval_days, 3);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod assessment;
pub mod config;
pub mod error;
pub mod irt;
pub mod placement;
pub mod report;
pub mod sanitize;
pub mod scheduler;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use config::{
    AssessmentConfig, CatConfig, FrequencyStratum, LearnerModelConfig, PlacementConfig,
    SchedulerConfig, ScreeningConfig,
};
pub use error::{AssessmentError, ValidationError};

pub use scheduler::{
    due_queue, retrievability, MemoryParams, MemoryState, Rating, ReviewScheduler,
    ReviewSnapshot, ScheduleResult,
};

pub use placement::{
    vocab_index, PlacementCandidate, PlacementEntry, PlacementOutcome, PlacementStaircase,
    PlacementState,
};

pub use irt::{
    fisher_information, map_update, probability, recall_estimate, ItemParams, RecallEstimate,
    ThetaState,
};

pub use assessment::{
    AssessmentItem, AssessmentResponse, AssessmentResult, AssessmentSession, AssessmentStage,
    BankItem, CompletionReason, ItemKind, StageKind, SubmitResult,
};

pub use report::{ability_report, probability_page, AbilityReport, ProbabilityPage};
