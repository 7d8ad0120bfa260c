//! Field validation for submissions, edits and request parameters.
//!
//! All checks run before the store is touched, so a rejected request never
//! leaves a partial write behind.

use uuid::Uuid;

use crate::error::{ItemError, Result};
use crate::models::ItemBody;

pub const MAX_TITLE_CHARS: usize = 80;
pub const MAX_TEXT_CHARS: usize = 5000;

/// Raw fields of a submission request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub title: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
}

/// A submission that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub title: String,
    pub body: ItemBody,
}

/// Raw fields of an edit request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edit {
    pub title: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEdit {
    pub title: String,
    pub text: Option<String>,
}

/// Empty strings count as absent.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Checks run in a fixed order: title presence, title length,
/// url/text exclusivity, text length.
pub fn validate_submission(submission: Submission) -> Result<ValidSubmission> {
    let title = present(submission.title).ok_or(ItemError::TitleRequiredError)?;
    if char_len(&title) > MAX_TITLE_CHARS {
        return Err(ItemError::TitleTooLongError);
    }

    let body = match (present(submission.url), present(submission.text)) {
        (Some(_), Some(_)) => return Err(ItemError::UrlAndTextError),
        (None, Some(text)) if char_len(&text) > MAX_TEXT_CHARS => {
            return Err(ItemError::TextTooLongError)
        }
        (None, Some(text)) => ItemBody::Text(text),
        (Some(url), None) => ItemBody::Url(url),
        (None, None) => return Err(ItemError::SubmitError),
    };

    Ok(ValidSubmission { title, body })
}

/// A missing title is a `SubmitError` here, unlike on submission.
pub fn validate_edit(edit: Edit) -> Result<ValidEdit> {
    let title = present(edit.title).ok_or(ItemError::SubmitError)?;
    if char_len(&title) > MAX_TITLE_CHARS {
        return Err(ItemError::TitleTooLongError);
    }

    let text = present(edit.text);
    if text.as_deref().is_some_and(|t| char_len(t) > MAX_TEXT_CHARS) {
        return Err(ItemError::TextTooLongError);
    }

    Ok(ValidEdit { title, text })
}

/// Parses a request id. `missing` is reported for absent, empty or malformed ids.
pub fn item_id(raw: Option<&str>, missing: ItemError) -> Result<Uuid> {
    raw.filter(|v| !v.is_empty())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or(missing)
}

/// Parses a 1-based page number.
pub fn parse_page(raw: Option<&str>) -> Result<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|page| *page > 0)
        .ok_or(ItemError::GetDataError)
}
