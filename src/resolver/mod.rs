//! Multi-source metric resolution.
//!
//! # Data Flow
//! ```text
//! Aggregator::resolve_all(keys)
//!     → one task per key → MetricResolver::resolve
//!         → FallbackResolver over each chain (legs concurrently)
//!         → TimeSeriesAligner for ratio and spread metrics
//!         → StalenessBoundedCache write on success, read on failure
//!     → BTreeMap<key, MetricOutcome>
//! ```
//!
//! # Design Decisions
//! - Provider order is total; no speculative parallel fetches within a chain
//! - Cache is a fallback only, never consulted before live sources
//! - Aggregation itself never fails; failures are per-key entries

pub mod aggregator;
pub mod align;
pub mod fallback;
pub mod metric;

pub use aggregator::{Aggregator, MetricOutcome};
pub use align::{AlignedPair, TimeSeriesAligner};
pub use fallback::{ChainExhausted, FallbackChain, FallbackResolver, Resolution};
pub use metric::{Combine, FlagRule, MetricDefinition, MetricResolver, MetricShape};
