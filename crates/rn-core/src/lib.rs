//! rusty-news/crates/rn-core/src/lib.rs
//!
//! The item interaction and ranking engine for Rusty-News, plus the port
//! traits its plugins implement.

pub mod config;
pub mod error;
pub mod guard;
pub mod memory;
pub mod models;
pub mod ranking;
pub mod service;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use config::*;
pub use error::*;
pub use models::*;
pub use ranking::{Feed, FeedOrder, ItemPage};
pub use service::ItemService;
pub use traits::*;
pub use validation::{Edit, Submission};
