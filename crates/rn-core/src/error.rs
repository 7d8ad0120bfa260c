//! # ItemError
//!
//! The closed set of failures an engine operation can report.
//! Each variant maps to exactly one boolean flag on the wire, e.g.
//! `{"titleTooLongError": true}`. Variants carry no internal detail;
//! store faults are logged where they happen and downgraded to
//! [`ItemError::SubmitError`] or [`ItemError::GetDataError`].

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemError {
    /// The action requires a signed-in user
    #[error("user is not signed in")]
    AuthError,

    #[error("title is required")]
    TitleRequiredError,

    #[error("title is longer than 80 characters")]
    TitleTooLongError,

    #[error("an item cannot have both a url and a text")]
    UrlAndTextError,

    #[error("text is longer than 5000 characters")]
    TextTooLongError,

    /// Generic mutation failure (missing input, unknown target, internal fault)
    #[error("request could not be submitted")]
    SubmitError,

    #[error("item not found")]
    NotFoundError,

    /// Signed-out user or not the item's author
    #[error("action not allowed for this user")]
    NotAllowedError,

    /// Generic read failure (bad page, internal fault)
    #[error("data could not be retrieved")]
    GetDataError,
}

impl ItemError {
    /// The JSON flag name of this failure.
    pub fn flag(&self) -> &'static str {
        match self {
            ItemError::AuthError => "authError",
            ItemError::TitleRequiredError => "titleRequiredError",
            ItemError::TitleTooLongError => "titleTooLongError",
            ItemError::UrlAndTextError => "urlAndTextError",
            ItemError::TextTooLongError => "textTooLongError",
            ItemError::SubmitError => "submitError",
            ItemError::NotFoundError => "notFoundError",
            ItemError::NotAllowedError => "notAllowedError",
            ItemError::GetDataError => "getDataError",
        }
    }
}

impl Serialize for ItemError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.flag(), &true)?;
        map.end()
    }
}

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, ItemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_single_flag() {
        let json = serde_json::to_value(ItemError::TitleTooLongError).unwrap();
        assert_eq!(json, serde_json::json!({ "titleTooLongError": true }));
    }

    #[test]
    fn flags_are_unique() {
        let all = [
            ItemError::AuthError,
            ItemError::TitleRequiredError,
            ItemError::TitleTooLongError,
            ItemError::UrlAndTextError,
            ItemError::TextTooLongError,
            ItemError::SubmitError,
            ItemError::NotFoundError,
            ItemError::NotAllowedError,
            ItemError::GetDataError,
        ];
        let flags: std::collections::HashSet<_> = all.iter().map(ItemError::flag).collect();
        assert_eq!(flags.len(), all.len());
    }
}
