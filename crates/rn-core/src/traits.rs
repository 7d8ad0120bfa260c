//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ActingUser, Item, Membership, MembershipOp, UserId};

/// Persistence contract for items.
///
/// Every mutation is atomic per item: two concurrent membership updates on
/// the same item from different users must both be reflected.
/// Mutations only touch live items; a missing or deleted target yields `None`.
#[async_trait]
pub trait ItemRepo: Send + Sync {
    async fn insert_item(&self, item: Item) -> anyhow::Result<()>;

    /// Fetches an item by id, tombstoned or not.
    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<Item>>;

    /// Adds or removes `user_id` in one of the item's member sets.
    async fn update_membership(
        &self,
        id: Uuid,
        set: Membership,
        op: MembershipOp,
        user_id: &str,
    ) -> anyhow::Result<Option<Item>>;

    /// Replaces title and text in one step.
    async fn update_content(&self, id: Uuid, edit: ContentEdit) -> anyhow::Result<Option<Item>>;

    /// Sets the tombstone. Already-deleted items yield `None`.
    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<Option<Item>>;

    /// One page of `filter`'s items, newest first (`created_at` desc, then `id` desc).
    async fn list_newest(
        &self,
        filter: &ListingFilter,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<Vec<Item>>;

    /// Ranking projection of every item admitted by `filter`, in no particular order.
    ///
    /// Only ids, creation times and vote counts are read; member sets stay
    /// in the store.
    async fn list_rank_entries(&self, filter: &ListingFilter) -> anyhow::Result<Vec<RankEntry>>;

    /// Fetches the given items, tombstoned or not. Unknown ids are skipped
    /// and the result order is unspecified.
    async fn get_items(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Item>>;
}

/// What the ranked order needs to know about an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub votes: usize,
}

impl From<&Item> for RankEntry {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            created_at: item.created_at,
            votes: item.points(),
        }
    }
}

/// Restriction on an item's vote count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoteBound {
    #[default]
    Any,
    AtLeast(usize),
    Below(usize),
}

impl VoteBound {
    pub fn admits(self, votes: usize) -> bool {
        match self {
            VoteBound::Any => true,
            VoteBound::AtLeast(min) => votes >= min,
            VoteBound::Below(max) => votes < max,
        }
    }
}

/// New editable fields of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEdit {
    pub title: String,
    pub text: Option<String>,
    pub edited_at: DateTime<Utc>,
}

/// Selects the items of one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    pub show: bool,
    /// Items hidden by this user are left out
    pub viewer: Option<UserId>,
    /// Inclusive upper bound on `created_at`
    pub created_until: DateTime<Utc>,
    /// Exclusive lower bound on `created_at`
    pub created_after: Option<DateTime<Utc>>,
    pub votes: VoteBound,
}

impl ListingFilter {
    /// Reference predicate; store implementations must agree with it.
    pub fn admits(&self, item: &Item) -> bool {
        !item.is_deleted()
            && item.is_show_item == self.show
            && item.created_at <= self.created_until
            && self.created_after.map_or(true, |after| item.created_at > after)
            && self.votes.admits(item.points())
            && self
                .viewer
                .as_ref()
                .map_or(true, |viewer| !item.hidden_by.contains(viewer))
    }
}

/// Identity contract. Turns request credentials into an acting user.
///
/// Unknown or invalid credentials resolve to a signed-out user; an `Err`
/// is reserved for infrastructure failures.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, credentials: Option<&str>) -> anyhow::Result<ActingUser>;
}
