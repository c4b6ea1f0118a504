pub mod config;
pub mod error;
pub mod item_bank;
pub mod logging;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{ServiceError, StoreError};
pub use item_bank::{InMemoryItemBank, ItemBankSource};
pub use service::{
    AbilitySource, AbilitySummary, AssessmentReport, AssessmentStarted, LearnerService,
    PlacementProgress, ReviewLogEntry,
};
pub use store::{InMemoryStore, StateStore, Versioned};
