//! Saved-entries screen state: load, optimistic delete, reload on failure.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use shared::{
    domain::{EntryId, ExerciseKind},
    protocol::Entry,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    error::ClientError,
    grouping::{group_entries, sort_newest_first, EntryGroup, GroupId},
    store::EntryStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Flat,
    /// Records saved within the same bucket are shown and deleted as one.
    Grouped { bucket_secs: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryListEvent {
    Loaded { count: usize },
    Removed { ids: Vec<EntryId> },
    Failed(ClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    Failed(ClientError),
    /// Superseded by a newer load, or the controller was disposed.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// A delete for the same record is already in flight.
    AlreadyPending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryListSnapshot {
    pub entries: Vec<Entry>,
    pub groups: Vec<EntryGroup>,
    pub error: Option<ClientError>,
    pub loading: bool,
}

#[derive(Default)]
struct EntryListState {
    entries: Vec<Entry>,
    groups: Vec<EntryGroup>,
    error: Option<ClientError>,
    loading: bool,
    pending_deletes: HashSet<EntryId>,
    load_generation: u64,
}

pub struct EntryListController {
    store: Arc<dyn EntryStore>,
    kind: ExerciseKind,
    mode: ListMode,
    inner: Mutex<EntryListState>,
    disposed: AtomicBool,
    events: broadcast::Sender<EntryListEvent>,
}

impl EntryListController {
    pub fn new(store: Arc<dyn EntryStore>, kind: ExerciseKind) -> Arc<Self> {
        Self::with_mode(store, kind, ListMode::Flat)
    }

    pub fn grouped(store: Arc<dyn EntryStore>, kind: ExerciseKind, bucket_secs: i64) -> Arc<Self> {
        Self::with_mode(store, kind, ListMode::Grouped { bucket_secs })
    }

    pub fn with_mode(store: Arc<dyn EntryStore>, kind: ExerciseKind, mode: ListMode) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            store,
            kind,
            mode,
            inner: Mutex::new(EntryListState::default()),
            disposed: AtomicBool::new(false),
            events,
        })
    }

    pub fn kind(&self) -> &ExerciseKind {
        &self.kind
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EntryListEvent> {
        self.events.subscribe()
    }

    /// Fetches the authoritative list. A failure empties the list and sets the
    /// error state; it is never returned as an `Err`.
    pub async fn load(&self) -> LoadOutcome {
        self.refresh(true).await
    }

    async fn refresh(&self, clear_on_failure: bool) -> LoadOutcome {
        if self.is_disposed() {
            return LoadOutcome::Discarded;
        }

        let generation = {
            let mut guard = self.inner.lock().await;
            guard.loading = true;
            guard.load_generation += 1;
            guard.load_generation
        };

        info!(exercise = %self.kind, "entries: loading");
        let result = self.store.fetch_entries(&self.kind).await;

        if self.is_disposed() {
            return LoadOutcome::Discarded;
        }

        let mut guard = self.inner.lock().await;
        if guard.load_generation != generation {
            return LoadOutcome::Discarded;
        }
        guard.loading = false;

        match result {
            Ok(mut entries) => {
                sort_newest_first(&mut entries);
                // Records with a delete still in flight stay hidden.
                let pending = &guard.pending_deletes;
                entries.retain(|entry| !pending.contains(&entry.id));
                guard.entries = entries;
                self.rebuild_groups(&mut guard);
                guard.error = None;

                let count = guard.entries.len();
                info!(exercise = %self.kind, count, "entries: loaded");
                let _ = self.events.send(EntryListEvent::Loaded { count });
                LoadOutcome::Loaded(count)
            }
            Err(err) => {
                warn!(exercise = %self.kind, error = %err, "entries: load failed");
                if clear_on_failure {
                    guard.entries.clear();
                    guard.groups.clear();
                }
                guard.error = Some(err.clone());
                let _ = self.events.send(EntryListEvent::Failed(err.clone()));
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Removes the record locally, then remotely. A remote failure triggers a
    /// reload so the list matches the store again, and the error is returned
    /// and kept as the screen's error state.
    pub async fn delete(&self, id: &EntryId) -> Result<DeleteOutcome, ClientError> {
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }

        {
            let mut guard = self.inner.lock().await;
            if guard.pending_deletes.contains(id) {
                return Ok(DeleteOutcome::AlreadyPending);
            }
            let Some(position) = guard.entries.iter().position(|entry| &entry.id == id) else {
                return Err(ClientError::validation(format!(
                    "entry {id} is not in the list"
                )));
            };
            guard.entries.remove(position);
            guard.pending_deletes.insert(id.clone());
            self.rebuild_groups(&mut guard);
        }
        let _ = self.events.send(EntryListEvent::Removed {
            ids: vec![id.clone()],
        });

        let result = self.store.delete_entry(&self.kind, id).await;
        {
            let mut guard = self.inner.lock().await;
            guard.pending_deletes.remove(id);
            if result.is_ok() {
                supersede_loads(&mut guard);
            }
        }

        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }

        match result {
            Ok(()) => {
                info!(exercise = %self.kind, entry_id = %id, "entries: deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => {
                warn!(exercise = %self.kind, entry_id = %id, error = %err, "entries: delete failed");
                self.reconcile(err.clone()).await;
                Err(err)
            }
        }
    }

    /// Deletes every record in a bucket. Only meaningful in grouped mode.
    pub async fn delete_group(&self, group_id: GroupId) -> Result<DeleteOutcome, ClientError> {
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        if !matches!(self.mode, ListMode::Grouped { .. }) {
            return Err(ClientError::validation(
                "group delete needs a grouped entry list",
            ));
        }

        let ids = {
            let mut guard = self.inner.lock().await;
            let Some(group) = guard.groups.iter().find(|group| group.id() == group_id) else {
                return Err(ClientError::validation(format!(
                    "group {} is not in the list",
                    group_id.0
                )));
            };
            let ids = group.entry_ids();
            if ids.iter().any(|id| guard.pending_deletes.contains(id)) {
                return Ok(DeleteOutcome::AlreadyPending);
            }
            guard.entries.retain(|entry| !ids.contains(&entry.id));
            guard.pending_deletes.extend(ids.iter().cloned());
            self.rebuild_groups(&mut guard);
            ids
        };
        let _ = self
            .events
            .send(EntryListEvent::Removed { ids: ids.clone() });

        let mut first_failure = None;
        for id in &ids {
            if let Err(err) = self.store.delete_entry(&self.kind, id).await {
                warn!(exercise = %self.kind, entry_id = %id, error = %err, "entries: group member delete failed");
                first_failure.get_or_insert(err);
            }
        }

        {
            let mut guard = self.inner.lock().await;
            for id in &ids {
                guard.pending_deletes.remove(id);
            }
            if first_failure.is_none() {
                supersede_loads(&mut guard);
            }
        }

        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }

        match first_failure {
            None => {
                info!(exercise = %self.kind, group = group_id.0, records = ids.len(), "entries: group deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Some(err) => {
                self.reconcile(err.clone()).await;
                Err(err)
            }
        }
    }

    async fn reconcile(&self, cause: ClientError) {
        if let LoadOutcome::Failed(err) = self.refresh(false).await {
            warn!(exercise = %self.kind, error = %err, "entries: reconcile reload failed, list may be stale");
        }
        if self.is_disposed() {
            return;
        }
        self.inner.lock().await.error = Some(cause.clone());
        let _ = self.events.send(EntryListEvent::Failed(cause));
    }

    fn rebuild_groups(&self, state: &mut EntryListState) {
        state.groups = match self.mode {
            ListMode::Flat => Vec::new(),
            ListMode::Grouped { bucket_secs } => group_entries(&state.entries, bucket_secs),
        };
    }

    pub async fn entries(&self) -> Vec<Entry> {
        self.inner.lock().await.entries.clone()
    }

    pub async fn groups(&self) -> Vec<EntryGroup> {
        self.inner.lock().await.groups.clone()
    }

    pub async fn error(&self) -> Option<ClientError> {
        self.inner.lock().await.error.clone()
    }

    pub async fn has_error(&self) -> bool {
        self.inner.lock().await.error.is_some()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.lock().await.loading
    }

    pub async fn dismiss_error(&self) {
        self.inner.lock().await.error = None;
    }

    pub async fn snapshot(&self) -> EntryListSnapshot {
        let guard = self.inner.lock().await;
        EntryListSnapshot {
            entries: guard.entries.clone(),
            groups: guard.groups.clone(),
            error: guard.error.clone(),
            loading: guard.loading,
        }
    }

    /// After this, results of calls still in flight are dropped.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// A fetch that started before a remote delete finished may still contain the
/// deleted record, so its result must not replace the list.
fn supersede_loads(state: &mut EntryListState) {
    state.load_generation += 1;
    state.loading = false;
}

#[cfg(test)]
#[path = "tests/entry_list_tests.rs"]
mod tests;
