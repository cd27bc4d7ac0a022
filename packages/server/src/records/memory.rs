use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MAX_LIST_LIMIT, NewRecord, Record, RecordChanges, RecordStore, RecordStoreError};

/// In-process record store with the same optimistic-versioning contract as
/// the database store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<Uuid, Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed record, bypassing id/timestamp assignment.
    pub async fn insert_raw(&self, record: Record) {
        self.records.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, limit: u64) -> Result<Vec<Record>, RecordStoreError> {
        let limit = limit.min(MAX_LIST_LIMIT) as usize;
        let guard = self.records.read().await;
        let mut records: Vec<Record> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Record>, RecordStoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewRecord) -> Result<Record, RecordStoreError> {
        let record = new.into_model(Uuid::now_v7());
        self.records
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, changes: &RecordChanges) -> Result<Record, RecordStoreError> {
        // Read and write under separate locks, like a read-then-conditional
        // UPDATE against the database.
        let current = self
            .records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RecordStoreError::NotFound)?;
        let next = changes.apply(&current);

        let mut guard = self.records.write().await;
        match guard.get_mut(&id) {
            None => Err(RecordStoreError::NotFound),
            Some(stored) if stored.version != current.version => {
                Err(RecordStoreError::WriteConflict)
            }
            Some(stored) => {
                *stored = next.clone();
                Ok(next)
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RecordStoreError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }
}
