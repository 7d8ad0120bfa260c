//! # Domain Models
//!
//! Items are the only entity the engine owns. Users live elsewhere and
//! reach the engine as an [`ActingUser`] resolved per request.
//! Item ids are UUID v7 so they sort in creation order.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque user identifier handed out by the identity resolver.
pub type UserId = String;

/// A submitted link or text post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    /// Author of the item; never changes after creation
    pub by: UserId,
    pub title: String,
    /// Link target. Mutually exclusive with `text`.
    pub url: Option<String>,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub voters: HashSet<UserId>,
    pub favorited_by: HashSet<UserId>,
    /// Per-user hide list; only affects that user's feeds
    pub hidden_by: HashSet<UserId>,
    pub is_show_item: bool,
    pub edited_at: Option<DateTime<Utc>>,
    /// Tombstone. Set once, never cleared.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Builds a fresh item with empty member sets.
    pub fn new(by: UserId, body: ItemBody, title: String, created_at: DateTime<Utc>) -> Self {
        let is_show_item = is_show_title(&title);
        let (url, text) = match body {
            ItemBody::Url(url) => (Some(url), None),
            ItemBody::Text(text) => (None, Some(text)),
        };

        Self {
            id: Uuid::now_v7(),
            by,
            title,
            url,
            text,
            created_at,
            voters: HashSet::new(),
            favorited_by: HashSet::new(),
            hidden_by: HashSet::new(),
            is_show_item,
            edited_at: None,
            deleted_at: None,
        }
    }

    pub fn points(&self) -> usize {
        self.voters.len()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_owned_by(&self, user: &ActingUser) -> bool {
        user.id().is_some_and(|id| id == self.by)
    }

    pub fn members(&self, set: Membership) -> &HashSet<UserId> {
        match set {
            Membership::Voters => &self.voters,
            Membership::FavoritedBy => &self.favorited_by,
            Membership::HiddenBy => &self.hidden_by,
        }
    }

    pub fn members_mut(&mut self, set: Membership) -> &mut HashSet<UserId> {
        match set {
            Membership::Voters => &mut self.voters,
            Membership::FavoritedBy => &mut self.favorited_by,
            Membership::HiddenBy => &mut self.hidden_by,
        }
    }

    /// Applies a membership change. Returns whether the set changed.
    pub fn apply(&mut self, set: Membership, op: MembershipOp, user_id: &str) -> bool {
        let members = self.members_mut(set);
        match op {
            MembershipOp::Add => members.insert(user_id.to_string()),
            MembershipOp::Remove => members.remove(user_id),
        }
    }
}

/// The body of a new item: exactly one of a link or a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemBody {
    Url(String),
    Text(String),
}

/// "Show HN" submissions are listed in their own feeds.
pub fn is_show_title(title: &str) -> bool {
    title
        .trim_start()
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("show hn"))
}

/// The three per-item user sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    Voters,
    FavoritedBy,
    HiddenBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOp {
    Add,
    Remove,
}

/// The caller of an engine operation, as resolved from request credentials.
///
/// Serialized as the `authUser` echo on read responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUser {
    pub user_signed_in: bool,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub karma: i64,
}

impl ActingUser {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        let user_id = user_id.into();
        Self {
            user_signed_in: true,
            username: Some(user_id.clone()),
            user_id: Some(user_id),
            karma: 0,
        }
    }

    /// The user id, only when the user is actually signed in.
    pub fn id(&self) -> Option<&str> {
        match self.user_signed_in {
            true => self.user_id.as_deref(),
            false => None,
        }
    }
}
