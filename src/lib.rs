#![deny(missing_docs)]

//! Live-stream channel feeds fetched over a bounded worker pool.
//!
//! This library fans independent per-channel lookups out across a fixed
//! number of worker threads, collects every item's result or error in
//! input order, and classifies the batch as complete, partial, or empty.
//! Feed fetchers and the channel widget are built on top of it.

mod error;
/// Feed fetchers for live-streaming platforms.
pub mod feed;
/// Bounded worker pools for executing batches of independent jobs.
pub mod pool;
mod widget;

pub use error::{FeedError, Result};
pub use feed::huya::{HuyaChannel, HuyaChannels};
pub use feed::{HttpPageSource, PageSource};
pub use pool::{execute, Job, Outcome, PoolConfig, PoolExecutor, RayonPool, SharedQueuePool};
pub use widget::{HuyaChannelsWidget, WidgetConfig};
