#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use danci_learner_algo::{BankItem, ItemKind};
use danci_learner_service::{
    Config, InMemoryItemBank, InMemoryStore, LearnerService, StateStore, StoreError, Versioned,
};

pub struct TestContext {
    pub service: LearnerService,
    pub store: Arc<InMemoryStore>,
    pub bank: Arc<InMemoryItemBank>,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

pub fn bank_items() -> Vec<BankItem> {
    let mut items = Vec::new();
    for rank in (1..20_000).step_by(200) {
        items.push(BankItem {
            id: format!("rr-{rank}"),
            kind: ItemKind::RealRecognition,
            vocabulary_id: Some(format!("v-{rank}")),
            frequency_rank: Some(rank),
            difficulty: None,
            guessing: None,
            exposure_count: 0,
        });
    }
    for rank in (50..20_000).step_by(250) {
        items.push(BankItem {
            id: format!("mc-{rank}"),
            kind: ItemKind::MultipleChoice,
            vocabulary_id: Some(format!("v-{rank}")),
            frequency_rank: Some(rank),
            difficulty: None,
            guessing: None,
            exposure_count: 0,
        });
    }
    for i in 0..10 {
        items.push(BankItem {
            id: format!("pw-{i}"),
            kind: ItemKind::Pseudoword,
            vocabulary_id: None,
            frequency_rank: None,
            difficulty: None,
            guessing: None,
            exposure_count: 0,
        });
    }
    items
}

pub fn create_context(config: Config) -> TestContext {
    let store = Arc::new(InMemoryStore::new());
    let bank = Arc::new(InMemoryItemBank::new(bank_items()));
    let service = LearnerService::new(store.clone(), bank.clone(), config);
    TestContext {
        service,
        store,
        bank,
    }
}

pub fn seeded_config() -> Config {
    Config {
        screening_seed: Some(17),
        ..Config::default()
    }
}

/// Store that rejects the next `failures` saves to keys under `prefix` with a
/// version conflict, then behaves like `InMemoryStore`.
pub struct FailingStore {
    inner: InMemoryStore,
    prefix: String,
    failures: AtomicU32,
}

impl FailingStore {
    pub fn new(prefix: &str, failures: u32) -> Self {
        Self {
            inner: InMemoryStore::new(),
            prefix: prefix.to_string(),
            failures: AtomicU32::new(failures),
        }
    }

    pub fn remaining_failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }
}

impl StateStore for FailingStore {
    fn load(&self, key: &str) -> Result<Option<Versioned<Value>>, StoreError> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, expected: Option<u64>, value: Value) -> Result<u64, StoreError> {
        if key.starts_with(&self.prefix) {
            let failed = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(StoreError::VersionConflict {
                    key: key.to_string(),
                    expected,
                    actual: expected.map(|v| v + 1),
                });
            }
        }
        self.inner.save(key, expected, value)
    }

    fn delete(&self, key: &str, expected: u64) -> Result<(), StoreError> {
        self.inner.delete(key, expected)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.keys_with_prefix(prefix)
    }

    fn append(&self, log: &str, entry: Value) -> Result<(), StoreError> {
        self.inner.append(log, entry)
    }

    fn read_log(&self, log: &str) -> Result<Vec<Value>, StoreError> {
        self.inner.read_log(log)
    }
}

pub struct FailingContext {
    pub service: LearnerService,
    pub store: Arc<FailingStore>,
    pub bank: Arc<InMemoryItemBank>,
}

pub fn create_failing_context(config: Config, prefix: &str, failures: u32) -> FailingContext {
    let store = Arc::new(FailingStore::new(prefix, failures));
    let bank = Arc::new(InMemoryItemBank::new(bank_items()));
    let service = LearnerService::new(store.clone(), bank.clone(), config);
    FailingContext {
        service,
        store,
        bank,
    }
}
