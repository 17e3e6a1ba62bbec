//! In-memory entry store with failure injection, shared by controller tests.

use std::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::{EntryId, ExerciseKind},
    protocol::{flexible_timestamp, Entry, EntryFields},
};
use tokio::sync::{Mutex, Notify};

use crate::{error::ClientError, store::EntryStore};

pub fn entry_at(id: &str, created_at_secs: i64, fields: &[(&str, &str)]) -> Entry {
    Entry {
        id: EntryId::from(id),
        created_at: flexible_timestamp::from_unix(created_at_secs).expect("timestamp"),
        fields: fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    }
}

pub fn kind(slug: &str) -> ExerciseKind {
    ExerciseKind::new(slug).expect("kind")
}

pub struct FakeStore {
    pub entries: Mutex<Vec<Entry>>,
    pub fail_fetch: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    /// Delete fails *and* the reconciling fetch fails too.
    pub fail_fetch_after_delete: AtomicBool,
    pub fetch_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub clock: AtomicI64,
    next_id: AtomicUsize,
    /// When set, deletes park until `release_deletes` is called.
    pub hold_deletes: AtomicBool,
    delete_gate: Notify,
    /// When set, fetches read the list, then park until `release_fetches`.
    pub hold_fetches: AtomicBool,
    fetch_gate: Notify,
    pub last_created: Mutex<Option<(ExerciseKind, EntryFields)>>,
}

impl FakeStore {
    pub fn with_entries(entries: Vec<Entry>) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(entries),
            fail_fetch: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_fetch_after_delete: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            clock: AtomicI64::new(1_700_000_000),
            next_id: AtomicUsize::new(1000),
            hold_deletes: AtomicBool::new(false),
            delete_gate: Notify::new(),
            hold_fetches: AtomicBool::new(false),
            fetch_gate: Notify::new(),
            last_created: Mutex::new(None),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with_entries(Vec::new())
    }

    pub fn release_deletes(&self) {
        self.hold_deletes.store(false, Ordering::SeqCst);
        self.delete_gate.notify_one();
    }

    pub fn release_fetches(&self) {
        self.hold_fetches.store(false, Ordering::SeqCst);
        self.fetch_gate.notify_one();
    }

    pub async fn ids(&self) -> Vec<EntryId> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }
}

#[async_trait]
impl EntryStore for FakeStore {
    async fn fetch_entries(&self, _kind: &ExerciseKind) -> Result<Vec<Entry>, ClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection reset".into()));
        }
        let entries = self.entries.lock().await.clone();
        if self.hold_fetches.load(Ordering::SeqCst) {
            self.fetch_gate.notified().await;
        }
        Ok(entries)
    }

    async fn create_entry(
        &self,
        kind: &ExerciseKind,
        fields: EntryFields,
    ) -> Result<Entry, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ClientError::server(500, None, "insert failed"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created_at = self.clock.fetch_add(1, Ordering::SeqCst);
        let entry = Entry {
            id: EntryId::from(id as i64),
            created_at: flexible_timestamp::from_unix(created_at).expect("timestamp"),
            fields: fields.clone(),
        };
        self.entries.lock().await.push(entry.clone());
        *self.last_created.lock().await = Some((kind.clone(), fields));
        Ok(entry)
    }

    async fn delete_entry(&self, _kind: &ExerciseKind, id: &EntryId) -> Result<(), ClientError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_deletes.load(Ordering::SeqCst) {
            self.delete_gate.notified().await;
        }
        if self.fail_delete.load(Ordering::SeqCst) {
            if self.fail_fetch_after_delete.load(Ordering::SeqCst) {
                self.fail_fetch.store(true, Ordering::SeqCst);
            }
            return Err(ClientError::Transport("delete timed out".into()));
        }
        self.entries.lock().await.retain(|entry| &entry.id != id);
        Ok(())
    }
}
