//! Dynamic lists of same-shaped sub-entries (e.g. urge / opposite action).

use indexmap::IndexMap;
use shared::{domain::ItemId, protocol::EntryFields};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub values: IndexMap<String, String>,
}

impl Item {
    fn blank(id: ItemId, field_ids: &[String]) -> Self {
        Self {
            id,
            values: field_ids
                .iter()
                .map(|field| (field.clone(), String::new()))
                .collect(),
        }
    }

    pub fn value(&self, field_id: &str) -> &str {
        self.values.get(field_id).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.values.values().all(|value| value.trim().is_empty())
    }
}

/// Never shorter than `min_items` (at least 1); ids are unique and grow as
/// `max + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatedItems {
    field_ids: Vec<String>,
    min_items: usize,
    items: Vec<Item>,
}

impl RepeatedItems {
    pub fn new<I, S>(field_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_min_items(field_ids, 1)
    }

    pub fn with_min_items<I, S>(field_ids: I, min_items: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field_ids: Vec<String> = field_ids.into_iter().map(Into::into).collect();
        let min_items = min_items.max(1);
        let items = blank_items(&field_ids, min_items);
        Self {
            field_ids,
            min_items,
            items,
        }
    }

    pub fn min_items(&self) -> usize {
        self.min_items
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add_item(&mut self) -> ItemId {
        let next = self
            .items
            .iter()
            .map(|item| item.id.0)
            .max()
            .map_or(1, |max| max + 1);
        let id = ItemId(next);
        self.items.push(Item::blank(id, &self.field_ids));
        id
    }

    /// Refused for unknown ids and when only `min_items` remain.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        if self.items.len() <= self.min_items {
            return false;
        }
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Edits one sub-field of one item. Unknown items or fields are ignored.
    pub fn set_value(&mut self, id: ItemId, field_id: &str, value: impl Into<String>) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        match item.values.get_mut(field_id) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn any_non_empty(&self) -> bool {
        self.items.iter().any(|item| !item.is_blank())
    }

    pub fn filled_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_blank()).count()
    }

    /// Whether enough items are filled in for a required step.
    pub fn meets_minimum(&self) -> bool {
        self.filled_count() >= self.min_items
    }

    pub fn reset(&mut self) {
        self.items = blank_items(&self.field_ids, self.min_items);
    }

    /// Renders non-blank items as `{field}_{n}`, numbered by position from 1.
    pub fn flatten_into(&self, fields: &mut EntryFields) {
        for (position, item) in self.items.iter().filter(|item| !item.is_blank()).enumerate() {
            for (field_id, value) in &item.values {
                if value.trim().is_empty() {
                    continue;
                }
                fields.insert(format!("{field_id}_{}", position + 1), value.clone());
            }
        }
    }
}

fn blank_items(field_ids: &[String], count: usize) -> Vec<Item> {
    (1..=count)
        .map(|n| Item::blank(ItemId(n as u32), field_ids))
        .collect()
}

#[cfg(test)]
#[path = "tests/items_tests.rs"]
mod tests;
