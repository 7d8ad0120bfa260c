//! # ItemService
//!
//! Submission, interactions, edits and deletion. Every operation runs the
//! guard before touching the store and validates its input before any write.
//! Listing operations live in [`crate::ranking`].

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{ItemError, Result};
use crate::guard::{authorize, authorize_caller, Action, Decision};
use crate::models::{ActingUser, Item, Membership, MembershipOp};
use crate::traits::{ContentEdit, ItemRepo};
use crate::validation::{item_id, validate_edit, validate_submission, Edit, Submission};

/// Entry point for every item operation. Cheap to clone.
#[derive(Clone)]
pub struct ItemService {
    pub(crate) repo: Arc<dyn ItemRepo>,
    pub(crate) config: EngineConfig,
}

impl ItemService {
    pub fn new(repo: Arc<dyn ItemRepo>, config: EngineConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one store call under the configured timeout.
    ///
    /// Faults and timeouts are logged with their detail and reported to the
    /// caller only as `fallback`.
    pub(crate) async fn store<T, F>(
        &self,
        op: &str,
        target: Option<Uuid>,
        fallback: ItemError,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let target = target.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                log::error!("{op} failed (item {target}): {e:#}");
                Err(fallback)
            }
            Err(_) => {
                log::error!(
                    "{op} timed out after {:?} (item {target})",
                    self.config.store_timeout
                );
                Err(fallback)
            }
        }
    }

    fn check(action: Action, decision: Decision) -> Result<()> {
        if let Decision::Denied(e) = decision {
            log::debug!("{} denied: {}", action.name(), e.flag());
        }
        decision.into_result()
    }

    pub async fn submit_new_item(&self, submission: Submission, user: &ActingUser) -> Result<Item> {
        Self::check(Action::Submit, authorize(Action::Submit, user, None))?;
        let author = user.id().ok_or(ItemError::AuthError)?;
        let valid = validate_submission(submission)?;

        let item = Item::new(author.to_string(), valid.body, valid.title, Utc::now());
        self.store(
            "insert_item",
            Some(item.id),
            ItemError::SubmitError,
            self.repo.insert_item(item.clone()),
        )
        .await?;

        log::info!("item {} submitted by {}", item.id, item.by);
        Ok(item)
    }

    pub async fn get_item_by_id(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        let id = item_id(id, ItemError::NotFoundError)?;
        let item = self
            .store("get_item", Some(id), ItemError::GetDataError, self.repo.get_item(id))
            .await?;

        Self::check(Action::Read, authorize(Action::Read, user, item.as_ref()))?;
        item.ok_or(ItemError::NotFoundError)
    }

    pub async fn upvote_item(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        self.interact(Action::Vote, Membership::Voters, MembershipOp::Add, id, user)
            .await
    }

    pub async fn unvote_item(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        self.interact(Action::Unvote, Membership::Voters, MembershipOp::Remove, id, user)
            .await
    }

    pub async fn favorite_item(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        self.interact(Action::Favorite, Membership::FavoritedBy, MembershipOp::Add, id, user)
            .await
    }

    pub async fn unfavorite_item(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        self.interact(
            Action::Unfavorite,
            Membership::FavoritedBy,
            MembershipOp::Remove,
            id,
            user,
        )
        .await
    }

    pub async fn hide_item(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        self.interact(Action::Hide, Membership::HiddenBy, MembershipOp::Add, id, user)
            .await
    }

    pub async fn unhide_item(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        self.interact(Action::Unhide, Membership::HiddenBy, MembershipOp::Remove, id, user)
            .await
    }

    /// Set-membership flip. Repeating it is a no-op, not an error.
    async fn interact(
        &self,
        action: Action,
        set: Membership,
        op: MembershipOp,
        id: Option<&str>,
        user: &ActingUser,
    ) -> Result<Item> {
        Self::check(action, authorize(action, user, None))?;
        let user_id = user.id().ok_or(ItemError::AuthError)?;
        let id = item_id(id, ItemError::SubmitError)?;

        self.store(
            action.name(),
            Some(id),
            ItemError::SubmitError,
            self.repo.update_membership(id, set, op, user_id),
        )
        .await?
        .ok_or(ItemError::SubmitError)
    }

    /// Loads the target of an owner-only action and runs the full guard on it.
    async fn owned_item(
        &self,
        action: Action,
        id: Option<&str>,
        missing: ItemError,
        fallback: ItemError,
        user: &ActingUser,
    ) -> Result<Item> {
        Self::check(action, authorize_caller(action, user))?;
        let id = item_id(id, missing)?;
        let item = self
            .store("get_item", Some(id), fallback, self.repo.get_item(id))
            .await?;

        Self::check(action, authorize(action, user, item.as_ref()))?;
        item.ok_or(ItemError::NotFoundError)
    }

    pub async fn get_edit_item_page_data(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        self.owned_item(
            Action::EditPageData,
            id,
            ItemError::NotFoundError,
            ItemError::GetDataError,
            user,
        )
        .await
    }

    /// Replaces title and text of the caller's own item.
    ///
    /// Link items keep no text: only their title changes.
    pub async fn edit_item(&self, id: Option<&str>, edit: Edit, user: &ActingUser) -> Result<Item> {
        Self::check(Action::Edit, authorize_caller(Action::Edit, user))?;
        if id.map_or(true, str::is_empty) {
            return Err(ItemError::SubmitError);
        }
        let valid = validate_edit(edit)?;

        let item = self
            .owned_item(
                Action::Edit,
                id,
                ItemError::SubmitError,
                ItemError::SubmitError,
                user,
            )
            .await?;

        let text = match item.url {
            Some(_) => None,
            None => valid.text,
        };
        let edit = ContentEdit {
            title: valid.title,
            text,
            edited_at: Utc::now(),
        };

        let updated = self
            .store(
                "update_content",
                Some(item.id),
                ItemError::SubmitError,
                self.repo.update_content(item.id, edit),
            )
            .await?
            .ok_or(ItemError::NotFoundError)?;

        log::info!("item {} edited by {}", updated.id, updated.by);
        Ok(updated)
    }

    pub async fn get_delete_item_page_data(
        &self,
        id: Option<&str>,
        user: &ActingUser,
    ) -> Result<Item> {
        self.owned_item(
            Action::DeletePageData,
            id,
            ItemError::NotFoundError,
            ItemError::GetDataError,
            user,
        )
        .await
    }

    /// Tombstones the caller's own item. Votes and other sets are kept.
    pub async fn delete_item(&self, id: Option<&str>, user: &ActingUser) -> Result<Item> {
        let item = self
            .owned_item(
                Action::Delete,
                id,
                ItemError::SubmitError,
                ItemError::SubmitError,
                user,
            )
            .await?;

        let deleted = self
            .store(
                "mark_deleted",
                Some(item.id),
                ItemError::SubmitError,
                self.repo.mark_deleted(item.id, Utc::now()),
            )
            .await?
            .ok_or(ItemError::NotFoundError)?;

        log::info!("item {} deleted by {}", deleted.id, deleted.by);
        Ok(deleted)
    }
}
