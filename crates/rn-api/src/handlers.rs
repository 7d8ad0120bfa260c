//! # rn-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the item engine.
//! Handlers resolve the acting user, hand the raw request fields to
//! `ItemService` and turn the outcome into a JSON body. Status is always 200,
//! including for bodies and query strings that fail to deserialize.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use rn_core::guard::{authorize_caller, Action, Decision};
use rn_core::traits::IdentityResolver;
use rn_core::{ActingUser, Edit, Feed, ItemError, ItemService, Submission};
use serde::Deserialize;

use crate::views::{self, PageResponse};

/// Name of the cookie carrying the user token.
pub const USER_COOKIE: &str = "user";

/// State shared across all Actix-web workers.
pub struct AppState {
    pub items: ItemService,
    pub identity: Box<dyn IdentityResolver>,
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitParams {
    pub title: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditParams {
    pub id: Option<String>,
    pub new_item_title: Option<String>,
    pub new_item_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub snapshot: Option<DateTime<Utc>>,
}

/// Token from the `user` cookie, or else from `Authorization: Bearer`.
fn credentials(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(USER_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Resolves the caller. Resolver failures degrade to a signed-out user.
async fn acting_user(data: &AppState, req: &HttpRequest) -> ActingUser {
    let credentials = credentials(req);
    match data.identity.resolve(credentials.as_deref()).await {
        Ok(user) => user,
        Err(e) => {
            log::error!("identity resolution failed: {e:#}");
            ActingUser::anonymous()
        }
    }
}

/// An extractor outcome, kept so the handler can answer with its own flag.
type Extracted<T> = Result<T, actix_web::Error>;

/// Unwraps a request payload. An unreadable one fails like the action's
/// caller check would, or else with `fallback`.
fn payload<T>(
    action: Action,
    user: &ActingUser,
    extracted: Extracted<T>,
    fallback: ItemError,
) -> Result<T, ItemError> {
    extracted.map_err(|e| {
        log::debug!("rejected {} payload: {e}", action.name());
        match authorize_caller(action, user) {
            Decision::Denied(denied) => denied,
            Decision::Allowed => fallback,
        }
    })
}

/// Plain liveness answer for "/"
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("rusty-news rest-api is working")
}

pub async fn submit_new_item(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: Extracted<web::Json<SubmitParams>>,
) -> HttpResponse {
    let user = acting_user(&data, &req).await;
    let SubmitParams { title, url, text } =
        match payload(Action::Submit, &user, body, ItemError::SubmitError) {
            Ok(body) => body.into_inner(),
            Err(e) => return views::failure(e, None),
        };

    match data
        .items
        .submit_new_item(Submission { title, url, text }, &user)
        .await
    {
        Ok(item) => views::item(item, &user, false),
        Err(e) => views::failure(e, None),
    }
}

pub async fn get_item_by_id(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: Extracted<web::Query<IdParams>>,
) -> HttpResponse {
    let user = acting_user(&data, &req).await;
    let query = match payload(Action::Read, &user, query, ItemError::NotFoundError) {
        Ok(query) => query,
        Err(e) => return views::failure(e, Some(&user)),
    };

    match data.items.get_item_by_id(query.id.as_deref(), &user).await {
        Ok(item) => views::item(item, &user, true),
        Err(e) => views::failure(e, Some(&user)),
    }
}

/// Generates the handler of one membership toggle.
macro_rules! interaction_handler {
    ($name:ident, $action:expr) => {
        pub async fn $name(
            data: web::Data<AppState>,
            req: HttpRequest,
            body: Extracted<web::Json<IdParams>>,
        ) -> HttpResponse {
            let user = acting_user(&data, &req).await;
            let body = match payload($action, &user, body, ItemError::SubmitError) {
                Ok(body) => body,
                Err(e) => return views::failure(e, None),
            };

            match data.items.$name(body.id.as_deref(), &user).await {
                Ok(item) => views::item(item, &user, false),
                Err(e) => views::failure(e, None),
            }
        }
    };
}

interaction_handler!(upvote_item, Action::Vote);
interaction_handler!(unvote_item, Action::Unvote);
interaction_handler!(favorite_item, Action::Favorite);
interaction_handler!(unfavorite_item, Action::Unfavorite);
interaction_handler!(hide_item, Action::Hide);
interaction_handler!(unhide_item, Action::Unhide);

pub async fn get_edit_item_page_data(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: Extracted<web::Query<IdParams>>,
) -> HttpResponse {
    let user = acting_user(&data, &req).await;
    let query = match payload(Action::EditPageData, &user, query, ItemError::NotFoundError) {
        Ok(query) => query,
        Err(e) => return views::failure(e, Some(&user)),
    };

    match data
        .items
        .get_edit_item_page_data(query.id.as_deref(), &user)
        .await
    {
        Ok(item) => views::item(item, &user, true),
        Err(e) => views::failure(e, Some(&user)),
    }
}

pub async fn edit_item(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: Extracted<web::Json<EditParams>>,
) -> HttpResponse {
    let user = acting_user(&data, &req).await;
    let EditParams {
        id,
        new_item_title,
        new_item_text,
    } = match payload(Action::Edit, &user, body, ItemError::SubmitError) {
        Ok(body) => body.into_inner(),
        Err(e) => return views::failure(e, Some(&user)),
    };
    let edit = Edit {
        title: new_item_title,
        text: new_item_text,
    };

    match data.items.edit_item(id.as_deref(), edit, &user).await {
        Ok(item) => views::item(item, &user, false),
        Err(e) => views::failure(e, Some(&user)),
    }
}

pub async fn get_delete_item_page_data(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: Extracted<web::Query<IdParams>>,
) -> HttpResponse {
    let user = acting_user(&data, &req).await;
    let query = match payload(Action::DeletePageData, &user, query, ItemError::NotFoundError) {
        Ok(query) => query,
        Err(e) => return views::failure(e, Some(&user)),
    };

    match data
        .items
        .get_delete_item_page_data(query.id.as_deref(), &user)
        .await
    {
        Ok(item) => views::item(item, &user, false),
        Err(e) => views::failure(e, Some(&user)),
    }
}

pub async fn delete_item(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: Extracted<web::Json<IdParams>>,
) -> HttpResponse {
    let user = acting_user(&data, &req).await;
    let body = match payload(Action::Delete, &user, body, ItemError::SubmitError) {
        Ok(body) => body,
        Err(e) => return views::failure(e, Some(&user)),
    };

    match data.items.delete_item(body.id.as_deref(), &user).await {
        Ok(item) => views::item(item, &user, false),
        Err(e) => views::failure(e, Some(&user)),
    }
}

async fn feed_page(
    feed: Feed,
    data: web::Data<AppState>,
    req: HttpRequest,
    query: Extracted<web::Query<PageParams>>,
) -> HttpResponse {
    let user = acting_user(&data, &req).await;
    let query = match payload(Action::Read, &user, query, ItemError::GetDataError) {
        Ok(query) => query,
        Err(e) => return views::failure(e, Some(&user)),
    };

    match data
        .items
        .feed_page(feed, query.page.as_deref(), query.snapshot, &user)
        .await
    {
        Ok(page) => HttpResponse::Ok().json(PageResponse::new(page, &user)),
        Err(e) => views::failure(e, Some(&user)),
    }
}

pub async fn get_ranked_items_by_page(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: Extracted<web::Query<PageParams>>,
) -> HttpResponse {
    feed_page(Feed::RANKED, data, req, query).await
}

pub async fn get_newest_items_by_page(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: Extracted<web::Query<PageParams>>,
) -> HttpResponse {
    feed_page(Feed::NEWEST, data, req, query).await
}

pub async fn get_ranked_show_items_by_page(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: Extracted<web::Query<PageParams>>,
) -> HttpResponse {
    feed_page(Feed::RANKED_SHOW, data, req, query).await
}

pub async fn get_newest_show_items_by_page(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: Extracted<web::Query<PageParams>>,
) -> HttpResponse {
    feed_page(Feed::NEWEST_SHOW, data, req, query).await
}
