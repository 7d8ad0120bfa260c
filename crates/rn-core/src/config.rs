//! Engine tunables.

use std::time::Duration;

/// Reference gravity for the ranked feeds.
pub const DEFAULT_GRAVITY: f64 = 1.8;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Items per listing page
    pub page_size: usize,
    /// How fast ranked items sink with age
    pub gravity: f64,
    /// Upper bound on a single store call
    pub store_timeout: Duration,
    /// Ranked feeds only consider items younger than this; `None` means all items
    pub ranking_window: Option<chrono::Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            gravity: DEFAULT_GRAVITY,
            store_timeout: Duration::from_secs(5),
            ranking_window: None,
        }
    }
}
