//! # Authorization Guard
//!
//! A pure decision function shared by every engine operation.
//! Rules are evaluated in order and the first match wins:
//!
//! 1. Interactions and submission require a signed-in user (`authError`).
//! 2. Edit/delete and their page-data reads require the signed-in author
//!    (`notAllowedError`); an unknown or deleted target is `notFoundError`.
//! 3. Reads by id require a live item (`notFoundError`). The author may
//!    still read their own tombstoned item.

use crate::error::{ItemError, Result};
use crate::models::{ActingUser, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Submit,
    Vote,
    Unvote,
    Favorite,
    Unfavorite,
    Hide,
    Unhide,
    EditPageData,
    Edit,
    DeletePageData,
    Delete,
    Read,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::Vote => "vote",
            Action::Unvote => "unvote",
            Action::Favorite => "favorite",
            Action::Unfavorite => "unfavorite",
            Action::Hide => "hide",
            Action::Unhide => "unhide",
            Action::EditPageData => "edit-page-data",
            Action::Edit => "edit",
            Action::DeletePageData => "delete-page-data",
            Action::Delete => "delete",
            Action::Read => "read",
        }
    }

    fn needs_owner(&self) -> bool {
        matches!(
            self,
            Action::EditPageData | Action::Edit | Action::DeletePageData | Action::Delete
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(ItemError),
}

impl Decision {
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(e) => Err(e),
        }
    }
}

/// The part of the policy that depends only on the caller.
///
/// Operations call this before resolving their target, so a signed-out
/// caller is refused before any id is looked at.
pub fn authorize_caller(action: Action, user: &ActingUser) -> Decision {
    match (action, user.id()) {
        (Action::Read, _) | (_, Some(_)) => Decision::Allowed,
        (action, None) if action.needs_owner() => Decision::Denied(ItemError::NotAllowedError),
        (_, None) => Decision::Denied(ItemError::AuthError),
    }
}

/// Decides whether `user` may perform `action` on `item`.
///
/// `item` is `None` when the target could not be resolved, or for actions
/// that have no target yet (submission) or that only need the user
/// (interactions, which resolve their target inside the store update).
pub fn authorize(action: Action, user: &ActingUser, item: Option<&Item>) -> Decision {
    if let Decision::Denied(e) = authorize_caller(action, user) {
        return Decision::Denied(e);
    }

    match action {
        Action::Submit
        | Action::Vote
        | Action::Unvote
        | Action::Favorite
        | Action::Unfavorite
        | Action::Hide
        | Action::Unhide => Decision::Allowed,
        action if action.needs_owner() => {
            match item {
                None => Decision::Denied(ItemError::NotFoundError),
                Some(item) if item.is_deleted() => Decision::Denied(ItemError::NotFoundError),
                Some(item) if !item.is_owned_by(user) => {
                    Decision::Denied(ItemError::NotAllowedError)
                }
                Some(_) => Decision::Allowed,
            }
        }
        _ => match item {
            Some(item) if !item.is_deleted() || item.is_owned_by(user) => Decision::Allowed,
            _ => Decision::Denied(ItemError::NotFoundError),
        },
    }
}
