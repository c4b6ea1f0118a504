use std::collections::HashSet;

use danci_learner_algo::BankItem;
use parking_lot::RwLock;

use crate::error::StoreError;

/// Source of assessment items; owns exposure bookkeeping.
pub trait ItemBankSource: Send + Sync {
    fn items(&self) -> Result<Vec<BankItem>, StoreError>;

    /// Increments `exposure_count` once per listed id. Unknown ids are ignored.
    fn record_exposures(&self, item_ids: &[String]) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryItemBank {
    items: RwLock<Vec<BankItem>>,
}

impl InMemoryItemBank {
    pub fn new(items: Vec<BankItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn exposure_of(&self, item_id: &str) -> Option<u32> {
        self.items
            .read()
            .iter()
            .find(|item| item.id == item_id)
            .map(|item| item.exposure_count)
    }
}

impl ItemBankSource for InMemoryItemBank {
    fn items(&self) -> Result<Vec<BankItem>, StoreError> {
        Ok(self.items.read().clone())
    }

    fn record_exposures(&self, item_ids: &[String]) -> Result<(), StoreError> {
        let ids: HashSet<&str> = item_ids.iter().map(String::as_str).collect();
        let mut items = self.items.write();
        for item in items.iter_mut().filter(|item| ids.contains(item.id.as_str())) {
            item.exposure_count = item.exposure_count.saturating_add(1);
        }
        Ok(())
    }
}
