//! In-memory doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::Mutex;

use time::OffsetDateTime;

use crate::domain::{OhlcRecord, ProcessingStatus, StatusEntry};
use crate::error::ServiceError;
use crate::query::ResolvedQuery;
use crate::repository::{BoxFuture, Repository};

/// Records every call and keeps rows in memory.
#[derive(Default)]
pub struct MemoryRepository {
    inserts: Mutex<Vec<Vec<OhlcRecord>>>,
    queries: Mutex<Vec<ResolvedQuery>>,
    statuses: Mutex<HashMap<String, StatusEntry>>,
    transitions: Mutex<Vec<(String, ProcessingStatus)>>,
}

impl MemoryRepository {
    pub fn insert_calls(&self) -> Vec<Vec<OhlcRecord>> {
        self.inserts.lock().expect("inserts").clone()
    }

    pub fn query_calls(&self) -> Vec<ResolvedQuery> {
        self.queries.lock().expect("queries").clone()
    }

    pub fn transitions_for(&self, file_name: &str) -> Vec<ProcessingStatus> {
        self.transitions
            .lock()
            .expect("transitions")
            .iter()
            .filter(|(name, _)| name == file_name)
            .map(|(_, status)| *status)
            .collect()
    }

    pub fn status(&self, file_name: &str) -> Option<StatusEntry> {
        self.statuses.lock().expect("statuses").get(file_name).cloned()
    }
}

impl Repository for MemoryRepository {
    fn insert_records<'a>(
        &'a self,
        records: &'a [OhlcRecord],
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            self.inserts.lock().expect("inserts").push(records.to_vec());
            Ok(())
        })
    }

    fn query_records<'a>(
        &'a self,
        query: &'a ResolvedQuery,
    ) -> BoxFuture<'a, Result<Vec<OhlcRecord>, ServiceError>> {
        Box::pin(async move {
            self.queries.lock().expect("queries").push(query.clone());
            let mut matching: Vec<OhlcRecord> = self
                .inserts
                .lock()
                .expect("inserts")
                .iter()
                .flatten()
                .filter(|record| {
                    record.symbol == query.symbol
                        && record.time >= query.start
                        && record.time <= query.end
                })
                .cloned()
                .collect();
            matching.sort_by_key(|record| record.time);
            Ok(matching
                .into_iter()
                .skip(query.offset() as usize)
                .take(query.limit() as usize)
                .collect())
        })
    }

    fn upsert_status<'a>(
        &'a self,
        entry: &'a StatusEntry,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            self.transitions
                .lock()
                .expect("transitions")
                .push((entry.file_name.clone(), entry.status));
            let mut statuses = self.statuses.lock().expect("statuses");
            let created_at = statuses
                .get(&entry.file_name)
                .map_or(entry.created_at, |existing| existing.created_at);
            statuses.insert(
                entry.file_name.clone(),
                StatusEntry {
                    created_at,
                    ..entry.clone()
                },
            );
            Ok(())
        })
    }

    fn get_status<'a>(
        &'a self,
        file_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<StatusEntry>, ServiceError>> {
        Box::pin(async move { Ok(self.status(file_name)) })
    }

    fn delete_status_before<'a>(
        &'a self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'a, Result<usize, ServiceError>> {
        Box::pin(async move {
            let mut statuses = self.statuses.lock().expect("statuses");
            let before = statuses.len();
            statuses.retain(|_, entry| entry.updated_at >= cutoff);
            Ok(before - statuses.len())
        })
    }
}
