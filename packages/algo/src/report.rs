//! Ability reporting
//!
//! Everything here is derived from a `ThetaState` and the resolved bank; none
//! of it feeds back into item selection.

use serde::{Deserialize, Serialize};

use crate::assessment::AssessmentItem;
use crate::config::FrequencyStratum;
use crate::irt::{probability, recall_estimate, RecallEstimate, ThetaState};
use crate::placement::vocab_index;
use crate::types::CefrBand;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProbability {
    pub item_id: String,
    pub vocabulary_id: Option<String>,
    pub frequency_rank: Option<u32>,
    pub estimate: RecallEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityPage {
    pub total: usize,
    pub offset: usize,
    pub items: Vec<ItemProbability>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StratumCoverage {
    pub min_rank: u32,
    pub max_rank: u32,
    pub item_count: usize,
    pub mean_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityReport {
    pub theta: f64,
    pub standard_error: f64,
    pub band: CefrBand,
    pub vocab_index: f64,
    pub vocabulary_size: f64,
    pub coverage: Vec<StratumCoverage>,
}

/// Expected number of known items: Σ P over real (non-pseudoword) items.
pub fn vocabulary_size(state: ThetaState, items: &[AssessmentItem]) -> f64 {
    items
        .iter()
        .filter(|item| !item.is_pseudoword())
        .map(|item| probability(state.theta, item.params()))
        .sum()
}

/// Mean recall probability per frequency stratum. Empty strata report 0.
pub fn coverage_by_stratum(
    state: ThetaState,
    items: &[AssessmentItem],
    strata: &[FrequencyStratum],
) -> Vec<StratumCoverage> {
    strata
        .iter()
        .map(|stratum| {
            let probs: Vec<f64> = items
                .iter()
                .filter(|item| !item.is_pseudoword())
                .filter(|item| item.frequency_rank.is_some_and(|r| stratum.contains(r)))
                .map(|item| probability(state.theta, item.params()))
                .collect();
            let mean_probability = if probs.is_empty() {
                0.0
            } else {
                probs.iter().sum::<f64>() / probs.len() as f64
            };
            StratumCoverage {
                min_rank: stratum.min_rank,
                max_rank: stratum.max_rank,
                item_count: probs.len(),
                mean_probability,
            }
        })
        .collect()
}

/// One page of per-item estimates, most frequent items first.
pub fn probability_page(
    state: ThetaState,
    items: &[AssessmentItem],
    offset: usize,
    limit: usize,
) -> ProbabilityPage {
    let mut real: Vec<&AssessmentItem> = items.iter().filter(|i| !i.is_pseudoword()).collect();
    real.sort_by(|a, b| {
        let ra = a.frequency_rank.unwrap_or(u32::MAX);
        let rb = b.frequency_rank.unwrap_or(u32::MAX);
        ra.cmp(&rb).then_with(|| a.id.cmp(&b.id))
    });

    let total = real.len();
    let page = real
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|item| ItemProbability {
            item_id: item.id.clone(),
            vocabulary_id: item.vocabulary_id.clone(),
            frequency_rank: item.frequency_rank,
            estimate: recall_estimate(state, item.params()),
        })
        .collect();

    ProbabilityPage {
        total,
        offset,
        items: page,
    }
}

pub fn ability_report(
    state: ThetaState,
    items: &[AssessmentItem],
    strata: &[FrequencyStratum],
) -> AbilityReport {
    AbilityReport {
        theta: state.theta,
        standard_error: state.standard_error(),
        band: CefrBand::from_theta(state.theta),
        vocab_index: vocab_index(state.theta),
        vocabulary_size: vocabulary_size(state, items),
        coverage: coverage_by_stratum(state, items, strata),
    }
}
