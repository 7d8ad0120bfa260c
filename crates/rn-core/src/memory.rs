//! In-memory `ItemRepo`.
//!
//! Each item sits in its own `DashMap` entry, so a membership update holds
//! the entry's write lock for the duration of one set insert/remove and
//! concurrent updates on the same item are serialized without loss.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Item, Membership, MembershipOp};
use crate::traits::{ContentEdit, ItemRepo, ListingFilter, RankEntry};

#[derive(Debug, Default)]
pub struct InMemoryItemRepo {
    items: DashMap<Uuid, Item>,
}

impl InMemoryItemRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `f` to a live item under its entry lock.
    fn with_live<F>(&self, id: Uuid, f: F) -> Option<Item>
    where
        F: FnOnce(&mut Item),
    {
        let mut entry = self.items.get_mut(&id)?;
        if entry.is_deleted() {
            return None;
        }
        f(entry.value_mut());
        Some(entry.value().clone())
    }

    /// Projection of the items `filter` admits. Nothing is cloned beyond it.
    fn admitted(&self, filter: &ListingFilter) -> Vec<RankEntry> {
        self.items
            .iter()
            .filter(|entry| filter.admits(entry.value()))
            .map(|entry| RankEntry::from(entry.value()))
            .collect()
    }
}

#[async_trait]
impl ItemRepo for InMemoryItemRepo {
    async fn insert_item(&self, item: Item) -> anyhow::Result<()> {
        match self.items.entry(item.id) {
            Entry::Occupied(_) => anyhow::bail!("item id {} already taken", item.id),
            Entry::Vacant(slot) => {
                slot.insert(item);
                Ok(())
            }
        }
    }

    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<Item>> {
        Ok(self.items.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_membership(
        &self,
        id: Uuid,
        set: Membership,
        op: MembershipOp,
        user_id: &str,
    ) -> anyhow::Result<Option<Item>> {
        Ok(self.with_live(id, |item| {
            item.apply(set, op, user_id);
        }))
    }

    async fn update_content(&self, id: Uuid, edit: ContentEdit) -> anyhow::Result<Option<Item>> {
        Ok(self.with_live(id, |item| {
            item.title = edit.title;
            item.text = edit.text;
            item.edited_at = Some(edit.edited_at);
        }))
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<Option<Item>> {
        Ok(self.with_live(id, |item| item.deleted_at = Some(at)))
    }

    async fn list_newest(
        &self,
        filter: &ListingFilter,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<Vec<Item>> {
        let mut keys = self.admitted(filter);
        keys.sort_unstable_by_key(|key| Reverse((key.created_at, key.id)));

        let ids: Vec<Uuid> = keys.iter().skip(offset).take(limit).map(|key| key.id).collect();
        Ok(ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn list_rank_entries(&self, filter: &ListingFilter) -> anyhow::Result<Vec<RankEntry>> {
        Ok(self.admitted(filter))
    }

    async fn get_items(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Item>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|entry| entry.value().clone()))
            .collect())
    }
}
