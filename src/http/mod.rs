//! Thin HTTP surface over the aggregator.
//!
//! # Data Flow
//! ```text
//! GET /api/indicators[?keys=a,b]  → Aggregator::resolve_all → 200 + map
//! GET /api/indicators/{key}       → Aggregator::resolve     → 200 | 404
//! GET /health                     → key count + cache summary
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
