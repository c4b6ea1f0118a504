//! CAT item selection
//!
//! Maximum Fisher information at the current theta, minus a small penalty per
//! prior exposure. Items at or above the exposure ceiling, and items already
//! administered in this session, are not eligible.

use std::collections::BTreeSet;

use super::bank::AssessmentItem;
use crate::config::CatConfig;
use crate::irt::fisher_information;
use crate::sanitize::finite_or;

#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub index: usize,
    pub item: &'a AssessmentItem,
    pub information: f64,
    pub score: f64,
}

pub fn is_eligible(
    item: &AssessmentItem,
    administered: &BTreeSet<String>,
    config: &CatConfig,
) -> bool {
    !item.is_pseudoword()
        && item.exposure_count < config.max_exposure
        && !administered.contains(&item.id)
}

pub fn select_next<'a>(
    pool: &'a [AssessmentItem],
    theta: f64,
    administered: &BTreeSet<String>,
    config: &CatConfig,
) -> Option<Selection<'a>> {
    pool.iter()
        .enumerate()
        .filter(|(_, item)| is_eligible(item, administered, config))
        .map(|(index, item)| {
            let information = finite_or(fisher_information(theta, item.params()), 0.0);
            let score = information - config.exposure_penalty * f64::from(item.exposure_count);
            Selection {
                index,
                item,
                information,
                score,
            }
        })
        .max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                // max_by keeps the last maximum, so reverse the id order to
                // make the smaller id win ties
                .then_with(|| b.item.id.cmp(&a.item.id))
        })
}
