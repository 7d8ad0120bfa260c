//! # rn-api
//!
//! The web routing and orchestration layer for Rusty-News.

pub mod handlers;
pub mod middleware;
pub mod views;

use actix_web::web;

/// Configures the routes for the item engine.
///
/// # Developer Note
/// Everything lives under `/items` so the binary can mount other route
/// groups (users, comments) next to it.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .service(
            web::scope("/items")
                .route("/submit-new-item", web::post().to(handlers::submit_new_item))
                .route("/get-item-by-id", web::get().to(handlers::get_item_by_id))
                .route("/upvote-item", web::post().to(handlers::upvote_item))
                .route("/unvote-item", web::put().to(handlers::unvote_item))
                .route("/favorite-item", web::post().to(handlers::favorite_item))
                .route("/unfavorite-item", web::put().to(handlers::unfavorite_item))
                .route("/hide-item", web::post().to(handlers::hide_item))
                .route("/unhide-item", web::put().to(handlers::unhide_item))
                .route(
                    "/get-edit-item-page-data",
                    web::get().to(handlers::get_edit_item_page_data),
                )
                .route("/edit-item", web::put().to(handlers::edit_item))
                .route(
                    "/get-delete-item-page-data",
                    web::get().to(handlers::get_delete_item_page_data),
                )
                .route("/delete-item", web::put().to(handlers::delete_item))
                // Feeds
                .route(
                    "/get-ranked-items-by-page",
                    web::get().to(handlers::get_ranked_items_by_page),
                )
                .route(
                    "/get-newest-items-by-page",
                    web::get().to(handlers::get_newest_items_by_page),
                )
                .route(
                    "/get-ranked-show-items-by-page",
                    web::get().to(handlers::get_ranked_show_items_by_page),
                )
                .route(
                    "/get-newest-show-items-by-page",
                    web::get().to(handlers::get_newest_show_items_by_page),
                ),
        );
}
