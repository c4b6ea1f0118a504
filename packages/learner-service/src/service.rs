//! Learner-facing operations over the pure learner model
//!
//! Each call loads the state it needs, applies one core operation and writes
//! the result back with compare-and-swap. A lost race surfaces as
//! `StoreError::VersionConflict`; retrying is up to the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use danci_learner_algo::assessment::resolve_bank;
use danci_learner_algo::report::{ability_report, probability_page, AbilityReport, ProbabilityPage};
use danci_learner_algo::{
    vocab_index, AssessmentItem, AssessmentResponse, AssessmentSession, CefrBand, CompletionReason,
    MemoryState, PlacementCandidate, PlacementOutcome, PlacementStaircase, PlacementState, Rating,
    ReviewScheduler, ReviewSnapshot, SubmitResult,
};

use crate::config::Config;
use crate::error::ServiceError;
use crate::item_bank::ItemBankSource;
use crate::store::{append_typed, keys, load_typed, read_log_typed, save_typed, StateStore};

// ==================== Records ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbilitySource {
    Placement,
    Assessment,
}

/// Latest persisted ability estimate for a learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilitySummary {
    pub source: AbilitySource,
    pub theta: f64,
    pub band: CefrBand,
    pub vocab_index: f64,
    /// Staircase convergence confidence, placement only
    pub confidence: Option<f64>,
    /// Posterior standard error, assessment only
    pub standard_error: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogEntry {
    pub item_id: String,
    pub snapshot: ReviewSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementProgress {
    /// `None` once the staircase has stopped and been discarded
    pub state: Option<PlacementState>,
    pub next_difficulty: Option<f64>,
    pub summary: Option<AbilitySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAssessment {
    learner_id: String,
    session: AssessmentSession,
    /// Completion side effects already persisted; each is re-attempted on
    /// the next call until it succeeds
    #[serde(default)]
    exposures_recorded: bool,
    #[serde(default)]
    ability_recorded: bool,
}

impl StoredAssessment {
    fn needs_settlement(&self) -> bool {
        self.session.is_done() && !(self.exposures_recorded && self.ability_recorded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStarted {
    pub session_id: String,
    pub screening_items: usize,
    pub first_item: Option<AssessmentItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    pub session_id: String,
    pub completed: bool,
    pub reason: Option<CompletionReason>,
    pub ability: AbilityReport,
    pub page: ProbabilityPage,
}

// ==================== Service ====================

pub struct LearnerService {
    store: Arc<dyn StateStore>,
    bank: Arc<dyn ItemBankSource>,
    config: Config,
    scheduler: ReviewScheduler,
    staircase: PlacementStaircase,
}

impl LearnerService {
    pub fn new(store: Arc<dyn StateStore>, bank: Arc<dyn ItemBankSource>, config: Config) -> Self {
        let scheduler = ReviewScheduler::new(config.model.scheduler.clone());
        let staircase = PlacementStaircase::new(config.model.placement.clone());
        Self {
            store,
            bank,
            config,
            scheduler,
            staircase,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -------------------- Review scheduling --------------------

    /// Applies a 1..4 rating to one learner × item memory record. Unknown
    /// pairs start from the initial parameters.
    pub fn review_item(
        &self,
        learner_id: &str,
        item_id: &str,
        rating: u8,
        now: DateTime<Utc>,
    ) -> Result<MemoryState, ServiceError> {
        let rating = Rating::try_from(rating)?;
        let key = keys::memory_key(learner_id, item_id);
        let stored = load_typed::<MemoryState>(self.store.as_ref(), &key)?;

        let (version, current) = match stored {
            Some(record) => (Some(record.version), record.value),
            None => (None, MemoryState::new(&self.scheduler, now)),
        };

        let (next, snapshot) = current.review(&self.scheduler, rating, now)?;
        save_typed(self.store.as_ref(), &key, version, &next)?;
        append_typed(
            self.store.as_ref(),
            &keys::review_log(learner_id),
            &ReviewLogEntry {
                item_id: item_id.to_string(),
                snapshot,
            },
        )?;

        tracing::debug!(
            learner_id,
            item_id,
            rating = ?rating,
            stability = next.stability,
            due = %next.due,
            "review recorded"
        );
        Ok(next)
    }

    pub fn suspend_item(
        &self,
        learner_id: &str,
        item_id: &str,
        suspended: bool,
    ) -> Result<MemoryState, ServiceError> {
        let key = keys::memory_key(learner_id, item_id);
        let record = load_typed::<MemoryState>(self.store.as_ref(), &key)?
            .ok_or_else(|| ServiceError::NotFound(key.clone()))?;

        let mut state = record.value;
        if suspended {
            state.suspend();
        } else {
            state.resume();
        }
        save_typed(self.store.as_ref(), &key, Some(record.version), &state)?;
        Ok(state)
    }

    /// Item ids due at `now`, least retrievable first.
    pub fn due_items(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<String>, ServiceError> {
        let prefix = keys::memory_prefix(learner_id);
        let mut entries = Vec::new();
        for key in self.store.keys_with_prefix(&prefix)? {
            let Some(item_id) = keys::unescape(&key[prefix.len()..]) else {
                tracing::warn!(key = %key, "skipping memory record with malformed key");
                continue;
            };
            if let Some(record) = load_typed::<MemoryState>(self.store.as_ref(), &key)? {
                entries.push((item_id, record.value));
            }
        }
        Ok(danci_learner_algo::due_queue(&entries, now, limit))
    }

    pub fn review_history(&self, learner_id: &str) -> Result<Vec<ReviewLogEntry>, ServiceError> {
        Ok(read_log_typed(
            self.store.as_ref(),
            &keys::review_log(learner_id),
        )?)
    }

    // -------------------- Placement --------------------

    /// Starts (or restarts) the staircase for a learner.
    pub fn start_placement(&self, learner_id: &str) -> Result<PlacementState, ServiceError> {
        let key = keys::placement_key(learner_id);
        let existing = self.store.load(&key)?.map(|r| r.version);
        let state = self.staircase.start();
        save_typed(self.store.as_ref(), &key, existing, &state)?;
        Ok(state)
    }

    pub fn placement_item_difficulty(&self, learner_id: &str) -> Result<f64, ServiceError> {
        let state = self.load_placement(learner_id)?.value;
        Ok(self.staircase.pick_difficulty(&state))
    }

    /// Unseen candidate nearest the current pick difficulty.
    pub fn pick_placement_item(
        &self,
        learner_id: &str,
        candidates: &[PlacementCandidate],
    ) -> Result<Option<PlacementCandidate>, ServiceError> {
        let state = self.load_placement(learner_id)?.value;
        Ok(self.staircase.pick_item(&state, candidates).cloned())
    }

    /// Applies one easy/hard judgment. When the staircase stops, the ability
    /// summary is persisted and the staircase state discarded.
    pub fn record_placement(
        &self,
        learner_id: &str,
        item_id: Option<&str>,
        outcome: PlacementOutcome,
        now: DateTime<Utc>,
    ) -> Result<PlacementProgress, ServiceError> {
        let record = self.load_placement(learner_id)?;
        let next = match item_id {
            Some(id) => self.staircase.record(&record.value, id, outcome),
            None => self.staircase.update(&record.value, outcome),
        };
        let key = keys::placement_key(learner_id);

        if !self.staircase.should_stop(&next) {
            save_typed(self.store.as_ref(), &key, Some(record.version), &next)?;
            return Ok(PlacementProgress {
                next_difficulty: Some(self.staircase.pick_difficulty(&next)),
                state: Some(next),
                summary: None,
            });
        }

        let estimate = self.staircase.to_estimate(&next);
        let summary = AbilitySummary {
            source: AbilitySource::Placement,
            theta: next.theta,
            band: estimate.band,
            vocab_index: estimate.vocab_index,
            confidence: Some(estimate.confidence),
            standard_error: None,
            updated_at: now,
        };
        self.store.delete(&key, record.version)?;
        self.save_ability(learner_id, &summary)?;

        tracing::info!(
            learner_id,
            band = %summary.band,
            responses = next.response_count,
            "placement finished"
        );
        Ok(PlacementProgress {
            state: None,
            next_difficulty: None,
            summary: Some(summary),
        })
    }

    // -------------------- Ability assessment --------------------

    pub fn start_assessment(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AssessmentStarted, ServiceError> {
        let items = self.bank.items()?;
        let session_id = Uuid::new_v4().to_string();
        let seed = self.config.screening_seed.unwrap_or_else(rand::random);

        let mut session = AssessmentSession::start(
            session_id.clone(),
            &items,
            self.config.model.assessment.clone(),
            seed,
            now,
        )?;
        let screening_items = match &session.stage {
            danci_learner_algo::AssessmentStage::Screening(state) => state.items.len(),
            _ => 0,
        };
        let first_item = session.next_item(now);

        let stored = StoredAssessment {
            learner_id: learner_id.to_string(),
            session,
            exposures_recorded: false,
            ability_recorded: false,
        };
        save_typed(
            self.store.as_ref(),
            &keys::assessment_key(&session_id),
            None,
            &stored,
        )?;

        tracing::info!(learner_id, session_id = %session_id, screening_items, "assessment started");
        Ok(AssessmentStarted {
            session_id,
            screening_items,
            first_item,
        })
    }

    /// Item to present next; `None` once the session is done. Also finishes
    /// any completion bookkeeping an earlier call could not persist.
    pub fn next_assessment_item(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AssessmentItem>, ServiceError> {
        let key = keys::assessment_key(session_id);
        let record = self.load_assessment(session_id)?;
        let mut version = record.version;
        let mut stored = record.value;
        let before = stored.session.clone();

        let item = stored.session.next_item(now);
        if stored.session != before {
            version = save_typed(self.store.as_ref(), &key, Some(version), &stored)?;
        }
        self.settle_completion(&key, version, &mut stored)?;
        Ok(item)
    }

    pub fn submit_assessment_response(
        &self,
        session_id: &str,
        item_id: &str,
        outcome: u8,
        now: DateTime<Utc>,
    ) -> Result<SubmitResult, ServiceError> {
        let key = keys::assessment_key(session_id);
        let record = self.load_assessment(session_id)?;
        let mut version = record.version;
        let mut stored = record.value;
        if stored.needs_settlement() {
            version = self.settle_completion(&key, version, &mut stored)?;
        }

        let result = stored.session.submit(item_id, outcome, now)?;
        version = save_typed(self.store.as_ref(), &key, Some(version), &stored)?;

        if let Some(response) = stored.session.responses.last() {
            append_typed(
                self.store.as_ref(),
                &keys::assessment_log(session_id),
                response,
            )?;
        }
        self.settle_completion(&key, version, &mut stored)?;
        Ok(result)
    }

    pub fn assessment_responses(
        &self,
        session_id: &str,
    ) -> Result<Vec<AssessmentResponse>, ServiceError> {
        Ok(read_log_typed(
            self.store.as_ref(),
            &keys::assessment_log(session_id),
        )?)
    }

    /// Ability report plus one page of per-item recall probabilities.
    /// Available once screening has produced a theta.
    pub fn assessment_report(
        &self,
        session_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<AssessmentReport, ServiceError> {
        let session = self.load_assessment(session_id)?.value.session;
        let theta = session.theta().ok_or_else(|| {
            ServiceError::InvalidState(format!("session {session_id} is still screening"))
        })?;
        let items = resolve_bank(&self.bank.items()?)?;
        let strata = &self.config.model.assessment.screening.strata;

        Ok(AssessmentReport {
            session_id: session_id.to_string(),
            completed: session.is_done(),
            reason: session.result().map(|r| r.reason),
            ability: ability_report(theta, &items, strata),
            page: probability_page(theta, &items, offset, limit),
        })
    }

    pub fn ability_summary(&self, learner_id: &str) -> Result<Option<AbilitySummary>, ServiceError> {
        Ok(load_typed(self.store.as_ref(), &keys::ability_key(learner_id))?.map(|r| r.value))
    }

    // -------------------- Helpers --------------------

    fn load_placement(
        &self,
        learner_id: &str,
    ) -> Result<crate::store::Versioned<PlacementState>, ServiceError> {
        let key = keys::placement_key(learner_id);
        load_typed(self.store.as_ref(), &key)?.ok_or(ServiceError::NotFound(key))
    }

    fn load_assessment(
        &self,
        session_id: &str,
    ) -> Result<crate::store::Versioned<StoredAssessment>, ServiceError> {
        let key = keys::assessment_key(session_id);
        load_typed(self.store.as_ref(), &key)?.ok_or(ServiceError::NotFound(key))
    }

    /// Persists the side effects of a finished session: bank exposures, then
    /// the ability summary. Each step is flagged in the stored record once it
    /// lands, so a failure part-way is picked up again by the next call.
    /// Returns the record's version after any writes.
    fn settle_completion(
        &self,
        key: &str,
        mut version: u64,
        stored: &mut StoredAssessment,
    ) -> Result<u64, ServiceError> {
        if !stored.needs_settlement() {
            return Ok(version);
        }
        let Some(result) = stored.session.result().cloned() else {
            return Ok(version);
        };

        if !stored.exposures_recorded {
            self.bank.record_exposures(&stored.session.exposure_updates())?;
            stored.exposures_recorded = true;
            version = save_typed(self.store.as_ref(), key, Some(version), &*stored)?;
        }

        if !stored.ability_recorded {
            let summary = AbilitySummary {
                source: AbilitySource::Assessment,
                theta: result.theta.theta,
                band: CefrBand::from_theta(result.theta.theta),
                vocab_index: vocab_index(result.theta.theta),
                confidence: None,
                standard_error: Some(result.standard_error),
                updated_at: result.completed_at,
            };
            self.save_ability(&stored.learner_id, &summary)?;
            stored.ability_recorded = true;
            version = save_typed(self.store.as_ref(), key, Some(version), &*stored)?;
        }

        tracing::info!(
            learner_id = %stored.learner_id,
            session_id = %stored.session.session_id,
            theta = result.theta.theta,
            se = result.standard_error,
            reason = ?result.reason,
            "assessment completed"
        );
        Ok(version)
    }

    /// Replaces the current summary. A concurrent writer surfaces as a
    /// version conflict; assessment completion retries it on the next call.
    fn save_ability(&self, learner_id: &str, summary: &AbilitySummary) -> Result<(), ServiceError> {
        let key = keys::ability_key(learner_id);
        let version = self.store.load(&key)?.map(|r| r.version);
        save_typed(self.store.as_ref(), &key, version, summary)?;
        Ok(())
    }
}
