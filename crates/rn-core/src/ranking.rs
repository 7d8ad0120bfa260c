//! # Ranking Engine
//!
//! Four paginated feeds: ranked and newest, each over ordinary or show items.
//!
//! Ranked order uses `score = max(votes - 1, 0) / (age_hours + 2)^gravity`,
//! recomputed on every read from the voter count and `created_at`, with
//! ties going to the newer item. Newest order is `created_at` desc then `id`
//! desc.
//!
//! A listing is computed against a snapshot instant: items created after
//! it are left out and ages are measured from it. Clients echo the snapshot
//! of page 1 when asking for page 2, so inserts in between do not shift
//! page boundaries.
//!
//! Items with fewer than [`SCORING_VOTES`] votes all score zero and so rank
//! below every other item, newest first. Ranked pages therefore only score
//! the voted items (from their [`RankEntry`] projection) and read the
//! remainder straight off the store's newest listing.

use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ItemError, Result};
use crate::models::{ActingUser, Item};
use crate::service::ItemService;
use crate::traits::{ListingFilter, RankEntry, VoteBound};
use crate::validation::parse_page;

/// Fewest votes that give a positive score.
pub const SCORING_VOTES: usize = 2;

/// One page of a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub page: u32,
    /// A further page exists at the same snapshot
    pub is_more: bool,
    pub snapshot: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrder {
    Ranked,
    Newest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feed {
    pub order: FeedOrder,
    pub show: bool,
}

impl Feed {
    pub const RANKED: Feed = Feed { order: FeedOrder::Ranked, show: false };
    pub const NEWEST: Feed = Feed { order: FeedOrder::Newest, show: false };
    pub const RANKED_SHOW: Feed = Feed { order: FeedOrder::Ranked, show: true };
    pub const NEWEST_SHOW: Feed = Feed { order: FeedOrder::Newest, show: true };

    fn name(&self) -> &'static str {
        match (self.order, self.show) {
            (FeedOrder::Ranked, false) => "ranked",
            (FeedOrder::Newest, false) => "newest",
            (FeedOrder::Ranked, true) => "ranked-show",
            (FeedOrder::Newest, true) => "newest-show",
        }
    }
}

/// Decaying rank score. Never negative.
pub fn score(votes: usize, age_hours: f64, gravity: f64) -> f64 {
    let points = votes.saturating_sub(1) as f64;
    points / (age_hours.max(0.0) + 2.0).powf(gravity)
}

pub fn age_hours(created_at: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    (at - created_at).num_milliseconds().max(0) as f64 / 3_600_000.0
}

/// Sorts `entries` into ranked order as of `at`.
pub fn rank(entries: &mut [RankEntry], at: DateTime<Utc>, gravity: f64) {
    entries.sort_by_cached_key(|entry| {
        let s = score(entry.votes, age_hours(entry.created_at, at), gravity);
        (Reverse(TotalF64(s)), Reverse(entry.created_at), Reverse(entry.id))
    });
}

/// `f64` ordered by `total_cmp`, so it can sit in a sort key.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TotalF64(f64);

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl ItemService {
    pub async fn get_ranked_items_by_page(
        &self,
        page: Option<&str>,
        snapshot: Option<DateTime<Utc>>,
        user: &ActingUser,
    ) -> Result<ItemPage> {
        self.feed_page(Feed::RANKED, page, snapshot, user).await
    }

    pub async fn get_newest_items_by_page(
        &self,
        page: Option<&str>,
        snapshot: Option<DateTime<Utc>>,
        user: &ActingUser,
    ) -> Result<ItemPage> {
        self.feed_page(Feed::NEWEST, page, snapshot, user).await
    }

    pub async fn get_ranked_show_items_by_page(
        &self,
        page: Option<&str>,
        snapshot: Option<DateTime<Utc>>,
        user: &ActingUser,
    ) -> Result<ItemPage> {
        self.feed_page(Feed::RANKED_SHOW, page, snapshot, user).await
    }

    pub async fn get_newest_show_items_by_page(
        &self,
        page: Option<&str>,
        snapshot: Option<DateTime<Utc>>,
        user: &ActingUser,
    ) -> Result<ItemPage> {
        self.feed_page(Feed::NEWEST_SHOW, page, snapshot, user).await
    }

    pub async fn feed_page(
        &self,
        feed: Feed,
        page: Option<&str>,
        snapshot: Option<DateTime<Utc>>,
        user: &ActingUser,
    ) -> Result<ItemPage> {
        let page = parse_page(page)?;
        let now = Utc::now();
        let snapshot = snapshot.map_or(now, |s| s.min(now));

        let size = self.config.page_size.max(1);
        let offset = (page as usize - 1).saturating_mul(size);

        let filter = ListingFilter {
            show: feed.show,
            viewer: user.id().map(str::to_string),
            created_until: snapshot,
            created_after: None,
            votes: VoteBound::Any,
        };

        let mut items = match feed.order {
            FeedOrder::Newest => {
                self.store(
                    feed.name(),
                    None,
                    ItemError::GetDataError,
                    self.repo.list_newest(&filter, size + 1, offset),
                )
                .await?
            }
            FeedOrder::Ranked => {
                // An out-of-range lower bound means no bound at all.
                let created_after = self
                    .config
                    .ranking_window
                    .and_then(|window| snapshot.checked_sub_signed(window));
                let filter = ListingFilter { created_after, ..filter };
                self.ranked_slice(feed, filter, snapshot, offset, size + 1)
                    .await?
            }
        };

        let is_more = items.len() > size;
        items.truncate(size);

        Ok(ItemPage { items, page, is_more, snapshot })
    }

    /// Items `offset..offset + want` of the ranked order as of `at`.
    async fn ranked_slice(
        &self,
        feed: Feed,
        filter: ListingFilter,
        at: DateTime<Utc>,
        offset: usize,
        want: usize,
    ) -> Result<Vec<Item>> {
        let scored = ListingFilter {
            votes: VoteBound::AtLeast(SCORING_VOTES),
            ..filter.clone()
        };
        let mut entries = self
            .store(
                feed.name(),
                None,
                ItemError::GetDataError,
                self.repo.list_rank_entries(&scored),
            )
            .await?;
        rank(&mut entries, at, self.config.gravity);

        let head: Vec<Uuid> = entries.iter().skip(offset).take(want).map(|e| e.id).collect();
        let mut items = if head.is_empty() {
            Vec::new()
        } else {
            self.store(
                feed.name(),
                None,
                ItemError::GetDataError,
                self.repo.get_items(&head),
            )
            .await?
        };

        // Deleted or hidden since the projection was read.
        items.retain(|item| filter.admits(item));
        let position: HashMap<Uuid, usize> =
            head.iter().enumerate().map(|(n, id)| (*id, n)).collect();
        items.sort_by_key(|item| position.get(&item.id).copied());

        if head.len() < want {
            let unscored = ListingFilter {
                votes: VoteBound::Below(SCORING_VOTES),
                ..filter
            };
            let skip = offset.saturating_sub(entries.len());
            let rest = self
                .store(
                    feed.name(),
                    None,
                    ItemError::GetDataError,
                    self.repo.list_newest(&unscored, want - head.len(), skip),
                )
                .await?;

            let seen: HashSet<Uuid> = items.iter().map(|item| item.id).collect();
            items.extend(rest.into_iter().filter(|item| !seen.contains(&item.id)));
        }

        Ok(items)
    }
}
