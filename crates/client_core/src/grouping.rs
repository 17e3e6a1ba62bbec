//! Display-side grouping of entries saved together.
//!
//! Some exercises store each statement of one save as its own record. Records
//! written within one bucket width of a group's first record are shown as a
//! single card, keyed by the floored bucket of that first record.

use chrono::{DateTime, Utc};
use shared::{domain::EntryId, protocol::Entry};

pub const DEFAULT_BUCKET_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryGroup {
    /// `bucket_start` of the oldest record; unique per grouping.
    pub bucket: i64,
    /// Oldest first.
    pub entries: Vec<Entry>,
}

impl EntryGroup {
    pub fn id(&self) -> GroupId {
        GroupId(self.bucket)
    }

    pub fn entry_ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    /// Every non-empty value of every record in the bucket, in writing order.
    pub fn values(&self) -> Vec<&str> {
        self.entries.iter().flat_map(Entry::values).collect()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.entries.first().map(|entry| entry.created_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn bucket_start(ts_secs: i64, bucket_secs: i64) -> i64 {
    let bucket_secs = bucket_secs.max(1);
    ts_secs.div_euclid(bucket_secs) * bucket_secs
}

/// Stable: entries with equal timestamps keep the order the store returned.
pub fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Groups records saved together, newest group first.
///
/// Walking oldest to newest, a record joins the open group while it is less
/// than `bucket_secs` after that group's first record; otherwise it opens a
/// new group. Since each group starts at least one bucket after the previous
/// one, the floored keys never collide.
pub fn group_entries(entries: &[Entry], bucket_secs: i64) -> Vec<EntryGroup> {
    let bucket_secs = bucket_secs.max(1);
    let mut ordered: Vec<Entry> = entries.to_vec();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut groups: Vec<EntryGroup> = Vec::new();
    for entry in ordered {
        let secs = entry.created_at_secs();
        match groups.last_mut() {
            Some(group)
                if group.entries.first().is_some_and(|first| {
                    secs.saturating_sub(first.created_at_secs()) < bucket_secs
                }) =>
            {
                group.entries.push(entry)
            }
            _ => groups.push(EntryGroup {
                bucket: bucket_start(secs, bucket_secs),
                entries: vec![entry],
            }),
        }
    }

    groups.reverse();
    groups
}

#[cfg(test)]
#[path = "tests/grouping_tests.rs"]
mod tests;
