//! stalecache library
//!
//! A stale-while-revalidate caching layer for HTTP requests: responses are
//! served from a generation-tagged store when present and refreshed in the
//! background, plus a few small utilities (ticker, vectors, playlists, events,
//! layers) and a GitHub client that can be routed through the cache.

pub mod cache;
pub mod cli;
pub mod events;
pub mod fetch;
pub mod github;
pub mod interceptor;
pub mod layers;
mod lock;
pub mod playlist;
pub mod refresh;
pub mod telemetry;
pub mod ticker;
pub mod vector;

pub use cache::{Generation, RequestDescriptor, ResponseSnapshot};
pub use fetch::{Fetcher, HttpFetcher};
pub use interceptor::{Interceptor, InterceptorConfig, Outcome, Served};
