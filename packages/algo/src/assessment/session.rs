//! Two-phase assessment session: `screening → catRunning → done`
//!
//! The session is a plain serializable value. Callers load it, apply one
//! call, and store it back before the next request. The CAT pool is resolved
//! once when the session starts and travels with the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::bank::{resolve_bank, AssessmentItem, BankItem};
use super::screening::{self, ScreeningAnswer, ScreeningScore};
use super::selection::{is_eligible, select_next};
use crate::config::{AssessmentConfig, CatConfig};
use crate::error::AssessmentError;
use crate::irt::{map_update, ThetaState};
use crate::sanitize::parse_outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageKind {
    Screening,
    CatRunning,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionReason {
    PrecisionReached,
    ResponseCap,
    PoolExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningState {
    pub items: Vec<AssessmentItem>,
    pub answers: Vec<ScreeningAnswer>,
    pub cat_pool: Vec<AssessmentItem>,
}

impl ScreeningState {
    fn next_item(&self) -> Option<&AssessmentItem> {
        self.items.get(self.answers.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatState {
    pub theta: ThetaState,
    pub pool: Vec<AssessmentItem>,
    pub administered: BTreeSet<String>,
    pub responses: u32,
    pub pending_item: Option<String>,
    pub screening: ScreeningScore,
}

/// Durable outcome of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub theta: ThetaState,
    pub standard_error: f64,
    pub cat_responses: u32,
    pub reason: CompletionReason,
    pub screening: ScreeningScore,
    pub administered_item_ids: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum AssessmentStage {
    Screening(ScreeningState),
    CatRunning(CatState),
    Done(AssessmentResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponsePhase {
    Screening,
    Cat,
}

/// Immutable audit record, one per presented item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub item_id: String,
    pub phase: ResponsePhase,
    /// Prior mean (0) during screening
    pub theta_before: f64,
    pub outcome: u8,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub stage: StageKind,
    pub theta: Option<ThetaState>,
    pub standard_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSession {
    pub session_id: String,
    pub config: AssessmentConfig,
    pub stage: AssessmentStage,
    pub responses: Vec<AssessmentResponse>,
    pub started_at: DateTime<Utc>,
}

impl AssessmentSession {
    pub fn start(
        session_id: impl Into<String>,
        bank: &[BankItem],
        config: AssessmentConfig,
        seed: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, AssessmentError> {
        let resolved = resolve_bank(bank)?;
        let items = screening::build_plan(&resolved, &config.screening, seed)?;
        let cat_pool = build_cat_pool(resolved, &config.cat);
        let session_id = session_id.into();

        tracing::debug!(
            session_id = %session_id,
            screening_items = items.len(),
            pool_size = cat_pool.len(),
            "assessment session started"
        );

        Ok(Self {
            session_id,
            config,
            stage: AssessmentStage::Screening(ScreeningState {
                items,
                answers: Vec::new(),
                cat_pool,
            }),
            responses: Vec::new(),
            started_at: now,
        })
    }

    pub fn stage_kind(&self) -> StageKind {
        match self.stage {
            AssessmentStage::Screening(_) => StageKind::Screening,
            AssessmentStage::CatRunning(_) => StageKind::CatRunning,
            AssessmentStage::Done(_) => StageKind::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.stage, AssessmentStage::Done(_))
    }

    pub fn theta(&self) -> Option<ThetaState> {
        match &self.stage {
            AssessmentStage::Screening(_) => None,
            AssessmentStage::CatRunning(cat) => Some(cat.theta),
            AssessmentStage::Done(result) => Some(result.theta),
        }
    }

    pub fn result(&self) -> Option<&AssessmentResult> {
        match &self.stage {
            AssessmentStage::Done(result) => Some(result),
            _ => None,
        }
    }

    /// Item to present next. In the CAT phase the selection is remembered so
    /// repeated calls return the same item until it is answered. Returns
    /// `None` once the session is done; an exhausted pool finishes the session.
    pub fn next_item(&mut self, now: DateTime<Utc>) -> Option<AssessmentItem> {
        let exhausted = match &mut self.stage {
            AssessmentStage::Screening(state) => return state.next_item().cloned(),
            AssessmentStage::Done(_) => return None,
            AssessmentStage::CatRunning(cat) => {
                if let Some(pending) = &cat.pending_item {
                    return cat.pool.iter().find(|item| &item.id == pending).cloned();
                }
                match select_next(&cat.pool, cat.theta.theta, &cat.administered, &self.config.cat)
                {
                    Some(selection) => {
                        let item = selection.item.clone();
                        cat.pending_item = Some(item.id.clone());
                        return Some(item);
                    }
                    None => true,
                }
            }
        };

        if exhausted {
            self.finish(CompletionReason::PoolExhausted, now);
        }
        None
    }

    /// Records the answer to the item last presented.
    pub fn submit(
        &mut self,
        item_id: &str,
        outcome: u8,
        now: DateTime<Utc>,
    ) -> Result<SubmitResult, AssessmentError> {
        let known = parse_outcome(outcome)?;

        match &mut self.stage {
            AssessmentStage::Done(_) => return Err(AssessmentError::SessionComplete),
            AssessmentStage::Screening(state) => {
                let expected = match state.next_item() {
                    Some(item) => item.id.clone(),
                    None => return Err(AssessmentError::UnknownItem(item_id.to_string())),
                };
                if !state.items.iter().any(|item| item.id == item_id) {
                    return Err(AssessmentError::UnknownItem(item_id.to_string()));
                }
                if expected != item_id {
                    return Err(AssessmentError::UnexpectedItem {
                        expected,
                        actual: item_id.to_string(),
                    });
                }

                state.answers.push(ScreeningAnswer {
                    item_id: item_id.to_string(),
                    known,
                });
                self.responses.push(AssessmentResponse {
                    item_id: item_id.to_string(),
                    phase: ResponsePhase::Screening,
                    theta_before: 0.0,
                    outcome,
                    answered_at: now,
                });

                if state.next_item().is_none() {
                    self.finish_screening(now);
                }
            }
            AssessmentStage::CatRunning(cat) => {
                let Some(index) = cat.pool.iter().position(|item| item.id == item_id) else {
                    return Err(AssessmentError::UnknownItem(item_id.to_string()));
                };
                if cat.pending_item.as_deref() != Some(item_id) {
                    return Err(AssessmentError::UnexpectedItem {
                        expected: cat.pending_item.clone().unwrap_or_default(),
                        actual: item_id.to_string(),
                    });
                }

                let theta_before = cat.theta;
                let item = &mut cat.pool[index];
                cat.theta = map_update(
                    theta_before,
                    item.params(),
                    known,
                    self.config.cat.min_variance,
                    self.config.cat.max_variance,
                );
                item.exposure_count += 1;
                cat.administered.insert(item_id.to_string());
                cat.responses += 1;
                cat.pending_item = None;

                self.responses.push(AssessmentResponse {
                    item_id: item_id.to_string(),
                    phase: ResponsePhase::Cat,
                    theta_before: theta_before.theta,
                    outcome,
                    answered_at: now,
                });

                self.check_stop(now);
            }
        }

        let theta = self.theta();
        Ok(SubmitResult {
            stage: self.stage_kind(),
            theta,
            standard_error: theta.map(|t| t.standard_error()),
        })
    }

    /// Applies the stopping rule. Idempotent: once done, always returns true
    /// without touching the result.
    pub fn check_stop(&mut self, now: DateTime<Utc>) -> bool {
        let reason = match &self.stage {
            AssessmentStage::Done(_) => return true,
            AssessmentStage::Screening(_) => return false,
            AssessmentStage::CatRunning(cat) => stop_reason(cat, &self.config.cat),
        };

        match reason {
            Some(reason) => {
                self.finish(reason, now);
                true
            }
            None => false,
        }
    }

    /// Item ids administered in the CAT phase; the caller increments their
    /// bank exposure counts.
    pub fn exposure_updates(&self) -> Vec<String> {
        match &self.stage {
            AssessmentStage::Screening(_) => Vec::new(),
            AssessmentStage::CatRunning(cat) => cat.administered.iter().cloned().collect(),
            AssessmentStage::Done(result) => result.administered_item_ids.clone(),
        }
    }

    fn finish_screening(&mut self, now: DateTime<Utc>) {
        let AssessmentStage::Screening(state) = &mut self.stage else {
            return;
        };
        let score = screening::score(&state.items, &state.answers, &self.config.screening);
        let theta = score.initial_theta(&self.config.screening);
        let pool = std::mem::take(&mut state.cat_pool);

        tracing::debug!(
            session_id = %self.session_id,
            hit_rate = score.hit_rate,
            false_alarm_rate = score.false_alarm_rate,
            theta0 = score.theta0,
            "screening finished"
        );

        self.stage = AssessmentStage::CatRunning(CatState {
            theta,
            pool,
            administered: BTreeSet::new(),
            responses: 0,
            pending_item: None,
            screening: score,
        });
        self.check_stop(now);
    }

    fn finish(&mut self, reason: CompletionReason, now: DateTime<Utc>) {
        let AssessmentStage::CatRunning(cat) = &self.stage else {
            return;
        };
        let result = AssessmentResult {
            theta: cat.theta,
            standard_error: cat.theta.standard_error(),
            cat_responses: cat.responses,
            reason,
            screening: cat.screening,
            administered_item_ids: cat.administered.iter().cloned().collect(),
            completed_at: now,
        };

        tracing::debug!(
            session_id = %self.session_id,
            theta = result.theta.theta,
            se = result.standard_error,
            responses = result.cat_responses,
            reason = ?reason,
            "assessment finished"
        );

        self.stage = AssessmentStage::Done(result);
    }
}

fn stop_reason(cat: &CatState, config: &CatConfig) -> Option<CompletionReason> {
    if cat.theta.standard_error() <= config.target_se {
        return Some(CompletionReason::PrecisionReached);
    }
    if cat.responses >= config.max_responses {
        return Some(CompletionReason::ResponseCap);
    }
    let any_eligible = cat
        .pool
        .iter()
        .any(|item| is_eligible(item, &cat.administered, config));
    if !any_eligible {
        return Some(CompletionReason::PoolExhausted);
    }
    None
}

/// Most frequent non-pseudoword items; unranked items sort last.
fn build_cat_pool(mut items: Vec<AssessmentItem>, config: &CatConfig) -> Vec<AssessmentItem> {
    items.retain(|item| !item.is_pseudoword());
    items.sort_by(|a, b| {
        let ra = a.frequency_rank.unwrap_or(u32::MAX);
        let rb = b.frequency_rank.unwrap_or(u32::MAX);
        ra.cmp(&rb).then_with(|| a.id.cmp(&b.id))
    });
    items.truncate(config.pool_size);
    items
}
