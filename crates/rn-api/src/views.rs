//! # Response Bodies
//!
//! Every response is HTTP 200 with a JSON body. Failures are told apart by
//! a single boolean flag (`{"notFoundError": true}`), optionally joined by
//! the `authUser` echo so clients can re-render on error.

use actix_web::HttpResponse;
use chrono::{DateTime, Utc};
use rn_core::{ActingUser, Item, ItemError, ItemPage};
use serde::Serialize;
use uuid::Uuid;

/// An item as seen by one viewer.
///
/// Member sets are reduced to flags for the viewer; only the author gets
/// the full lists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: Uuid,
    pub by: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub created: DateTime<Utc>,
    pub points: usize,
    pub is_show_item: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub voted_on_by_user: bool,
    pub favorited_by_user: bool,
    pub hidden_by_user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Members>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Members {
    pub voters: Vec<String>,
    pub favorited_by: Vec<String>,
    pub hidden_by: Vec<String>,
}

fn sorted(set: std::collections::HashSet<String>) -> Vec<String> {
    let mut list: Vec<_> = set.into_iter().collect();
    list.sort();
    list
}

impl ItemView {
    pub fn new(item: Item, viewer: &ActingUser) -> Self {
        let flag = |set: &std::collections::HashSet<String>| {
            viewer.id().is_some_and(|id| set.contains(id))
        };
        let voted_on_by_user = flag(&item.voters);
        let favorited_by_user = flag(&item.favorited_by);
        let hidden_by_user = flag(&item.hidden_by);
        let points = item.points();
        let owner = item.is_owned_by(viewer);

        Self {
            id: item.id,
            by: item.by,
            title: item.title,
            url: item.url,
            text: item.text,
            created: item.created_at,
            points,
            is_show_item: item.is_show_item,
            edited_at: item.edited_at,
            deleted_at: item.deleted_at,
            voted_on_by_user,
            favorited_by_user,
            hidden_by_user,
            members: owner.then(|| Members {
                voters: sorted(item.voters),
                favorited_by: sorted(item.favorited_by),
                hidden_by: sorted(item.hidden_by),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse<'a> {
    pub item: ItemView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_user: Option<&'a ActingUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<'a> {
    pub items: Vec<ItemView>,
    pub page: u32,
    pub is_more: bool,
    pub snapshot: DateTime<Utc>,
    pub auth_user: &'a ActingUser,
}

impl<'a> PageResponse<'a> {
    pub fn new(page: ItemPage, viewer: &'a ActingUser) -> Self {
        Self {
            items: page
                .items
                .into_iter()
                .map(|item| ItemView::new(item, viewer))
                .collect(),
            page: page.page,
            is_more: page.is_more,
            snapshot: page.snapshot,
            auth_user: viewer,
        }
    }
}

/// Success body for a single item.
pub fn item(item: Item, viewer: &ActingUser, echo: bool) -> HttpResponse {
    HttpResponse::Ok().json(ItemResponse {
        item: ItemView::new(item, viewer),
        auth_user: echo.then_some(viewer),
    })
}

/// Failure body: the error's flag, plus `authUser` when `echo` is set.
pub fn failure(error: ItemError, viewer: Option<&ActingUser>) -> HttpResponse {
    let mut body = serde_json::Map::new();
    body.insert(error.flag().to_string(), serde_json::Value::Bool(true));
    if let Some(viewer) = viewer {
        body.insert("authUser".to_string(), serde_json::json!(viewer));
    }
    HttpResponse::Ok().json(body)
}
