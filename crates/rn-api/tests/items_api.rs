use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use rn_api::handlers::AppState;
use rn_api::{configure_routes, middleware};
use rn_auth_simple::SimpleIdentityResolver;
use rn_core::memory::InMemoryItemRepo;
use rn_core::{EngineConfig, ItemService};
use serde_json::{json, Value};

const SECRET: &str = "test-secret";

fn state(page_size: usize) -> web::Data<AppState> {
    let config = EngineConfig {
        page_size,
        ..EngineConfig::default()
    };
    web::Data::new(AppState {
        items: ItemService::new(Arc::new(InMemoryItemRepo::new()), config),
        identity: Box::new(SimpleIdentityResolver::new(SECRET)),
    })
}

fn token(user: &str) -> String {
    SimpleIdentityResolver::new(SECRET).sign(user)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .wrap(middleware::security_headers())
                .configure(configure_routes),
        )
        .await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

#[actix_web::test]
async fn submit_vote_and_read_back() {
    let state = state(30);
    let app = app!(state);

    let created = send!(
        app,
        test::TestRequest::post()
            .uri("/items/submit-new-item")
            .cookie(Cookie::new("user", token("alice")))
            .set_json(json!({ "title": "Show HN: rusty", "url": "https://example.com" }))
    );
    let id = created["item"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["item"]["by"], "alice");
    assert_eq!(created["item"]["isShowItem"], true);
    assert!(created.get("authUser").is_none());

    let voted = send!(
        app,
        test::TestRequest::post()
            .uri("/items/upvote-item")
            .insert_header(("Authorization", format!("Bearer {}", token("bob"))))
            .set_json(json!({ "id": id }))
    );
    assert_eq!(voted["item"]["points"], 1);
    assert_eq!(voted["item"]["votedOnByUser"], true);

    let read = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/items/get-item-by-id?id={id}"))
            .cookie(Cookie::new("user", token("alice")))
    );
    assert_eq!(read["authUser"]["userId"], "alice");
    assert_eq!(read["item"]["members"]["voters"], json!(["bob"]));
}

#[actix_web::test]
async fn failures_are_flags_with_status_ok() {
    let state = state(30);
    let app = app!(state);

    let body = send!(
        app,
        test::TestRequest::post()
            .uri("/items/submit-new-item")
            .set_json(json!({ "title": "t", "text": "x" }))
    );
    assert_eq!(body, json!({ "authError": true }));

    let body = send!(
        app,
        test::TestRequest::post()
            .uri("/items/submit-new-item")
            .cookie(Cookie::new("user", token("alice")))
            .set_json(json!({ "title": "t", "url": "u", "text": "x" }))
    );
    assert_eq!(body, json!({ "urlAndTextError": true }));

    let body = send!(
        app,
        test::TestRequest::get().uri("/items/get-item-by-id?id=not-a-uuid")
    );
    assert_eq!(body["notFoundError"], true);
    assert_eq!(body["authUser"]["userSignedIn"], false);

    let body = send!(
        app,
        test::TestRequest::put()
            .uri("/items/edit-item")
            .set_json(json!({ "id": "x", "newItemTitle": "t" }))
    );
    assert_eq!(body["notAllowedError"], true);

    let body = send!(
        app,
        test::TestRequest::post()
            .uri("/items/upvote-item")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(body, json!({ "authError": true }));

    let body = send!(
        app,
        test::TestRequest::post()
            .uri("/items/upvote-item")
            .cookie(Cookie::new("user", token("bob")))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(body, json!({ "submitError": true }));
}

#[actix_web::test]
async fn unreadable_queries_keep_the_route_flag_and_echo() {
    let state = state(30);
    let app = app!(state);

    for uri in [
        "/items/get-ranked-items-by-page?page=1&snapshot=garbage",
        "/items/get-newest-items-by-page?page=1&page=2",
    ] {
        let body = send!(
            app,
            test::TestRequest::get()
                .uri(uri)
                .cookie(Cookie::new("user", token("alice")))
        );
        assert_eq!(body["getDataError"], true, "{uri}");
        assert_eq!(body["authUser"]["userId"], "alice", "{uri}");
    }

    for uri in [
        "/items/get-item-by-id?id=a&id=b",
        "/items/get-edit-item-page-data?id=a&id=b",
        "/items/get-delete-item-page-data?id=a&id=b",
    ] {
        let body = send!(
            app,
            test::TestRequest::get()
                .uri(uri)
                .cookie(Cookie::new("user", token("alice")))
        );
        assert_eq!(body["notFoundError"], true, "{uri}");
        assert_eq!(body["authUser"]["userId"], "alice", "{uri}");
    }

    let body = send!(
        app,
        test::TestRequest::get().uri("/items/get-edit-item-page-data?id=a&id=b")
    );
    assert_eq!(body["notAllowedError"], true);
    assert_eq!(body["authUser"]["userSignedIn"], false);
}

#[actix_web::test]
async fn unreadable_edit_and_delete_bodies_echo_the_user() {
    let state = state(30);
    let app = app!(state);

    for uri in ["/items/edit-item", "/items/delete-item"] {
        let body = send!(
            app,
            test::TestRequest::put()
                .uri(uri)
                .cookie(Cookie::new("user", token("alice")))
                .insert_header(("Content-Type", "application/json"))
                .set_payload("[1, 2")
        );
        assert_eq!(body["submitError"], true, "{uri}");
        assert_eq!(body["authUser"]["userId"], "alice", "{uri}");

        let body = send!(
            app,
            test::TestRequest::put()
                .uri(uri)
                .insert_header(("Content-Type", "application/json"))
                .set_payload("[1, 2")
        );
        assert_eq!(body["notAllowedError"], true, "{uri}");
        assert_eq!(body["authUser"]["userSignedIn"], false, "{uri}");
    }
}

#[actix_web::test]
async fn favorite_and_hide_toggle_per_user() {
    let state = state(30);
    let app = app!(state);

    let created = send!(
        app,
        test::TestRequest::post()
            .uri("/items/submit-new-item")
            .cookie(Cookie::new("user", token("alice")))
            .set_json(json!({ "title": "toggles", "url": "https://t.io" }))
    );
    let id = created["item"]["id"].as_str().unwrap().to_string();

    let toggles = [
        (test::TestRequest::post(), "/items/favorite-item", "favoritedByUser", true),
        (test::TestRequest::post(), "/items/favorite-item", "favoritedByUser", true),
        (test::TestRequest::put(), "/items/unfavorite-item", "favoritedByUser", false),
        (test::TestRequest::post(), "/items/hide-item", "hiddenByUser", true),
        (test::TestRequest::put(), "/items/unhide-item", "hiddenByUser", false),
    ];
    for (req, uri, flag, expected) in toggles {
        let body = send!(
            app,
            req.uri(uri)
                .cookie(Cookie::new("user", token("bob")))
                .set_json(json!({ "id": id }))
        );
        assert_eq!(body["item"][flag], expected, "{uri}");
    }

    let hidden = send!(
        app,
        test::TestRequest::post()
            .uri("/items/hide-item")
            .cookie(Cookie::new("user", token("bob")))
            .set_json(json!({ "id": id }))
    );
    assert_eq!(hidden["item"]["hiddenByUser"], true);

    let for_bob = send!(
        app,
        test::TestRequest::get()
            .uri("/items/get-newest-items-by-page?page=1")
            .cookie(Cookie::new("user", token("bob")))
    );
    assert!(for_bob["items"].as_array().unwrap().is_empty());

    let for_carol = send!(
        app,
        test::TestRequest::get()
            .uri("/items/get-newest-items-by-page?page=1")
            .cookie(Cookie::new("user", token("carol")))
    );
    assert_eq!(for_carol["items"].as_array().unwrap().len(), 1);

    let body = send!(
        app,
        test::TestRequest::put()
            .uri("/items/unfavorite-item")
            .set_json(json!({ "id": id }))
    );
    assert_eq!(body, json!({ "authError": true }));
}

#[actix_web::test]
async fn edit_flow_through_page_data() {
    let state = state(30);
    let app = app!(state);

    let created = send!(
        app,
        test::TestRequest::post()
            .uri("/items/submit-new-item")
            .cookie(Cookie::new("user", token("alice")))
            .set_json(json!({ "title": "draft", "text": "first body" }))
    );
    let id = created["item"]["id"].as_str().unwrap().to_string();

    let page_data = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/items/get-edit-item-page-data?id={id}"))
            .cookie(Cookie::new("user", token("alice")))
    );
    assert_eq!(page_data["item"]["title"], "draft");
    assert_eq!(page_data["authUser"]["userId"], "alice");

    let foreign = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/items/get-edit-item-page-data?id={id}"))
            .cookie(Cookie::new("user", token("mallory")))
    );
    assert_eq!(foreign["notAllowedError"], true);

    let edited = send!(
        app,
        test::TestRequest::put()
            .uri("/items/edit-item")
            .cookie(Cookie::new("user", token("alice")))
            .set_json(json!({ "id": id, "newItemTitle": "final", "newItemText": "second body" }))
    );
    assert_eq!(edited["item"]["title"], "final");
    assert_eq!(edited["item"]["text"], "second body");
    assert!(edited["item"]["editedAt"].is_string());

    let too_long = send!(
        app,
        test::TestRequest::put()
            .uri("/items/edit-item")
            .cookie(Cookie::new("user", token("alice")))
            .set_json(json!({ "id": id, "newItemTitle": "x".repeat(81) }))
    );
    assert_eq!(too_long["titleTooLongError"], true);
    assert_eq!(too_long["authUser"]["userId"], "alice");

    let not_owner = send!(
        app,
        test::TestRequest::put()
            .uri("/items/edit-item")
            .cookie(Cookie::new("user", token("mallory")))
            .set_json(json!({ "id": id, "newItemTitle": "hijacked" }))
    );
    assert_eq!(not_owner["notAllowedError"], true);

    let read = send!(
        app,
        test::TestRequest::get().uri(&format!("/items/get-item-by-id?id={id}"))
    );
    assert_eq!(read["item"]["title"], "final");
}

#[actix_web::test]
async fn feeds_page_and_reject_bad_pages() {
    let state = state(2);
    let app = app!(state);

    for title in ["one", "two", "three", "Show HN: four"] {
        send!(
            app,
            test::TestRequest::post()
                .uri("/items/submit-new-item")
                .cookie(Cookie::new("user", token("alice")))
                .set_json(json!({ "title": title, "text": "body" }))
        );
    }

    let first = send!(
        app,
        test::TestRequest::get().uri("/items/get-newest-items-by-page?page=1")
    );
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    assert_eq!(first["isMore"], true);

    let second = send!(
        app,
        test::TestRequest::get().uri("/items/get-newest-items-by-page?page=2")
    );
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["isMore"], false);
    assert_eq!(second["page"], 2);

    let show = send!(
        app,
        test::TestRequest::get().uri("/items/get-ranked-show-items-by-page?page=1")
    );
    assert_eq!(show["items"].as_array().unwrap().len(), 1);
    assert_eq!(show["isMore"], false);

    for page in ["0", "-1", "abc"] {
        let body = send!(
            app,
            test::TestRequest::get().uri(&format!("/items/get-ranked-items-by-page?page={page}"))
        );
        assert_eq!(body["getDataError"], true);
        assert!(body.get("authUser").is_some());
    }
}

#[actix_web::test]
async fn only_the_author_deletes() {
    let state = state(30);
    let app = app!(state);

    let created = send!(
        app,
        test::TestRequest::post()
            .uri("/items/submit-new-item")
            .cookie(Cookie::new("user", token("alice")))
            .set_json(json!({ "title": "mine", "text": "body" }))
    );
    let id = created["item"]["id"].as_str().unwrap().to_string();

    let page_data = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/items/get-delete-item-page-data?id={id}"))
            .cookie(Cookie::new("user", token("alice")))
    );
    assert_eq!(page_data["item"]["title"], "mine");
    assert!(page_data.get("authUser").is_none());

    let foreign = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/items/get-delete-item-page-data?id={id}"))
            .cookie(Cookie::new("user", token("mallory")))
    );
    assert_eq!(foreign["notAllowedError"], true);

    let denied = send!(
        app,
        test::TestRequest::put()
            .uri("/items/delete-item")
            .cookie(Cookie::new("user", token("mallory")))
            .set_json(json!({ "id": id }))
    );
    assert_eq!(denied["notAllowedError"], true);

    let deleted = send!(
        app,
        test::TestRequest::put()
            .uri("/items/delete-item")
            .cookie(Cookie::new("user", token("alice")))
            .set_json(json!({ "id": id }))
    );
    assert!(deleted["item"]["deletedAt"].is_string());

    let feed = send!(
        app,
        test::TestRequest::get().uri("/items/get-newest-items-by-page?page=1")
    );
    assert!(feed["items"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn security_headers_are_set() {
    let state = state(30);
    let app = app!(state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
}
