//! Input sources feeding device reports into the store.

pub mod feed;

pub use feed::{FeedStats, run_feed, spawn_stdin_feed};
