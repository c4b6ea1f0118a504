//! Item bank resolution
//!
//! Bank entries arrive from the caller with optional calibration. Each entry
//! is resolved once to `(b, g)`: calibrated values when present, otherwise a
//! frequency-rank fallback for `b` and a per-kind default for `g`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::irt::ItemParams;

/// Rank at which the fallback difficulty is 0
const REFERENCE_RANK: f64 = 2000.0;
const RANK_SCALE: f64 = 2.0;
const DIFFICULTY_LIMIT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    RealRecognition,
    Pseudoword,
    MultipleChoice,
    Recall,
}

impl ItemKind {
    pub fn default_guessing(self) -> f64 {
        match self {
            ItemKind::MultipleChoice => 0.25,
            ItemKind::RealRecognition | ItemKind::Pseudoword | ItemKind::Recall => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::RealRecognition => "real-recognition",
            ItemKind::Pseudoword => "pseudoword",
            ItemKind::MultipleChoice => "multiple-choice",
            ItemKind::Recall => "recall",
        }
    }
}

/// Bank entry as stored by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankItem {
    pub id: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub vocabulary_id: Option<String>,
    #[serde(default)]
    pub frequency_rank: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub guessing: Option<f64>,
    #[serde(default)]
    pub exposure_count: u32,
}

/// Bank entry with resolved IRT parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentItem {
    pub id: String,
    pub kind: ItemKind,
    pub vocabulary_id: Option<String>,
    pub frequency_rank: Option<u32>,
    pub difficulty: f64,
    pub guessing: f64,
    pub exposure_count: u32,
}

impl AssessmentItem {
    pub fn params(&self) -> ItemParams {
        ItemParams::new(self.difficulty, self.guessing)
    }

    pub fn is_pseudoword(&self) -> bool {
        self.kind == ItemKind::Pseudoword
    }

    pub fn resolve(item: &BankItem) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidItemParams {
            item_id: item.id.clone(),
            reason,
        };

        if item.kind == ItemKind::Pseudoword && item.vocabulary_id.is_some() {
            return Err(invalid(
                "pseudowords cannot reference a vocabulary item".to_string(),
            ));
        }

        let difficulty = match (item.difficulty, item.frequency_rank, item.kind) {
            (Some(b), _, _) => b,
            (None, Some(rank), _) => rank_to_difficulty(rank),
            (None, None, ItemKind::Pseudoword) => 0.0,
            (None, None, _) => {
                return Err(invalid(
                    "needs a calibrated difficulty or a frequency rank".to_string(),
                ))
            }
        };
        let guessing = item.guessing.unwrap_or_else(|| item.kind.default_guessing());

        let params = ItemParams::new(difficulty, guessing);
        if !params.is_valid() {
            return Err(invalid(format!(
                "difficulty must be finite and guessing in [0, 1), got b={difficulty} g={guessing}"
            )));
        }

        Ok(Self {
            id: item.id.clone(),
            kind: item.kind,
            vocabulary_id: item.vocabulary_id.clone(),
            frequency_rank: item.frequency_rank,
            difficulty,
            guessing,
            exposure_count: item.exposure_count,
        })
    }
}

/// Resolves the whole bank, failing on the first malformed entry.
pub fn resolve_bank(items: &[BankItem]) -> Result<Vec<AssessmentItem>, ValidationError> {
    items.iter().map(AssessmentItem::resolve).collect()
}

/// Fallback difficulty from frequency rank: 2·log10(rank / 2000), clamped to ±3.
pub fn rank_to_difficulty(rank: u32) -> f64 {
    let rank = f64::from(rank.max(1));
    (RANK_SCALE * (rank / REFERENCE_RANK).log10()).clamp(-DIFFICULTY_LIMIT, DIFFICULTY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(id: &str, rank: u32) -> BankItem {
        BankItem {
            id: id.to_string(),
            kind: ItemKind::MultipleChoice,
            vocabulary_id: Some(format!("v-{id}")),
            frequency_rank: Some(rank),
            difficulty: None,
            guessing: None,
            exposure_count: 0,
        }
    }

    #[test]
    fn test_rank_to_difficulty() {
        assert!((rank_to_difficulty(2000) - 0.0).abs() < 1e-12);
        assert!((rank_to_difficulty(200) + 2.0).abs() < 1e-12);
        assert!((rank_to_difficulty(20000) - 2.0).abs() < 1e-12);
        assert_eq!(rank_to_difficulty(0), -3.0);
        assert_eq!(rank_to_difficulty(u32::MAX), 3.0);
        assert!(rank_to_difficulty(500) < rank_to_difficulty(5000));
    }

    #[test]
    fn test_resolve_uses_fallbacks() {
        let item = AssessmentItem::resolve(&word("a", 2000)).unwrap();
        assert_eq!(item.difficulty, 0.0);
        assert_eq!(item.guessing, 0.25);
    }

    #[test]
    fn test_resolve_prefers_calibration() {
        let mut bank_item = word("a", 2000);
        bank_item.difficulty = Some(1.2);
        bank_item.guessing = Some(0.1);
        let item = AssessmentItem::resolve(&bank_item).unwrap();
        assert_eq!(item.difficulty, 1.2);
        assert_eq!(item.guessing, 0.1);
    }

    #[test]
    fn test_resolve_rejects_bad_params() {
        let mut bad_guess = word("a", 10);
        bad_guess.guessing = Some(1.0);
        assert!(AssessmentItem::resolve(&bad_guess).is_err());

        let mut unranked = word("b", 10);
        unranked.frequency_rank = None;
        assert!(AssessmentItem::resolve(&unranked).is_err());

        let pseudo_with_ref = BankItem {
            kind: ItemKind::Pseudoword,
            ..word("c", 10)
        };
        assert!(AssessmentItem::resolve(&pseudo_with_ref).is_err());
    }

    #[test]
    fn test_resolve_bank_pseudoword() {
        let pseudo = BankItem {
            id: "blick".into(),
            kind: ItemKind::Pseudoword,
            vocabulary_id: None,
            frequency_rank: None,
            difficulty: None,
            guessing: None,
            exposure_count: 0,
        };
        let items = resolve_bank(&[pseudo, word("w", 100)]).unwrap();
        assert!(items[0].is_pseudoword());
        assert!(!items[1].is_pseudoword());
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ItemKind::RealRecognition).unwrap();
        assert_eq!(json, "\"real-recognition\"");
        assert_eq!(ItemKind::MultipleChoice.as_str(), "multiple-choice");
    }
}
