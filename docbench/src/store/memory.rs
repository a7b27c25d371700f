use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, Filter, Update};
use crate::{
    error::StoreError,
    record::{RecordId, SyntheticRecord},
};

/// In-process document store.
///
/// Records live in id order alongside a value index, so `ValueEq` filters pick
/// the lowest matching id without scanning the dataset. Identifiers come from a
/// monotonically increasing counter that survives `drop_dataset`, so ids are
/// never reused within one store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    dataset: RwLock<Dataset>,
}

#[derive(Debug, Default)]
struct Dataset {
    records: BTreeMap<RecordId, SyntheticRecord>,
    by_value: HashMap<i64, BTreeSet<RecordId>>,
}

impl Dataset {
    fn insert(&mut self, record: SyntheticRecord, id: RecordId) {
        self.by_value
            .entry(record.value)
            .or_default()
            .insert(id.clone());
        self.records.insert(id, record);
    }

    fn first_match(&self, filter: Filter) -> Option<RecordId> {
        match filter {
            Filter::All => self.records.keys().next().cloned(),
            Filter::ValueEq(value) => self
                .by_value
                .get(&value)
                .and_then(|ids| ids.first())
                .cloned(),
        }
    }

    fn unindex(&mut self, value: i64, id: &RecordId) {
        if let Some(ids) = self.by_value.get_mut(&value) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_value.remove(&value);
            }
        }
    }

    fn set_value(&mut self, id: &RecordId, value: i64) {
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        let old = std::mem::replace(&mut record.value, value);
        self.unindex(old, id);
        self.by_value.entry(value).or_default().insert(id.clone());
    }

    fn remove(&mut self, id: &RecordId) {
        if let Some(record) = self.records.remove(id) {
            self.unindex(record.value, id);
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored record, in id order.
    pub async fn snapshot(&self) -> Vec<SyntheticRecord> {
        self.dataset.read().await.records.values().cloned().collect()
    }

    fn allocate_id(&self) -> RecordId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        RecordId(format!("{n:016x}"))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, mut record: SyntheticRecord) -> Result<RecordId, StoreError> {
        let id = self.allocate_id();
        record.id = Some(id.clone());
        self.dataset.write().await.insert(record, id.clone());
        Ok(id)
    }

    async fn update_one(&self, filter: Filter, update: Update) -> Result<bool, StoreError> {
        let mut dataset = self.dataset.write().await;
        let Some(id) = dataset.first_match(filter) else {
            return Ok(false);
        };
        match update {
            Update::SetValue(value) => dataset.set_value(&id, value),
        }
        Ok(true)
    }

    async fn delete_one(&self, filter: Filter) -> Result<bool, StoreError> {
        let mut dataset = self.dataset.write().await;
        let Some(id) = dataset.first_match(filter) else {
            return Ok(false);
        };
        dataset.remove(&id);
        Ok(true)
    }

    async fn drop_dataset(&self) -> Result<(), StoreError> {
        *self.dataset.write().await = Dataset::default();
        Ok(())
    }

    async fn count(&self, filter: Filter) -> Result<u64, StoreError> {
        let dataset = self.dataset.read().await;
        let n = match filter {
            Filter::All => dataset.records.len(),
            Filter::ValueEq(value) => dataset.by_value.get(&value).map_or(0, BTreeSet::len),
        };
        Ok(n as u64)
    }
}
