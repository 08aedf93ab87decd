//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resolution layer produces:
//!     → logging.rs (structured tracing events, EnvFilter)
//!     → metrics.rs (provider attempts, resolutions, cache writes)
//!
//! Consumers:
//!     → stdout log stream
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Fields over formatted strings: provider, metric, attempt, elapsed
//! - API keys never reach a log line (transport errors drop the URL)
//! - Metric calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
