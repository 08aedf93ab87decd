//! Resilient multi-source financial indicator feed.
//!
//! Resolves dashboard metrics (market-cap-to-GDP, gold, VIX, yield spread,
//! quotes) from several unreliable upstreams: ordered provider fallback,
//! a staleness-bounded last-known-good cache, cross-series period alignment
//! and concurrent per-metric aggregation.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod observability;
pub mod providers;
pub mod resilience;
pub mod resolver;

pub use config::FeedConfig;
pub use http::HttpServer;
pub use resolver::{Aggregator, MetricOutcome};
