//! Data model shared by providers, resolvers and the aggregator.
//!
//! # Data Flow
//! ```text
//! upstream payload
//!     → Provider::parse → Series (ordered Observations, one provider)
//!     → resolver (fallback / align / combine)
//!     → MetricResult + ProviderAttempt trail
//! ```
//!
//! # Design Decisions
//! - `ObsValue::Missing` is an explicit variant, never zero or NaN
//! - Series are normalized on construction (ascending, unique periods)
//! - Everything here is plain data; behaviour lives in `resolver`

pub mod period;
pub mod result;
pub mod series;

pub use period::{Granularity, PeriodKey};
pub use result::{AttemptOutcome, Components, LegValue, MetricResult, ProviderAttempt};
pub use series::{round2, ObsValue, Observation, Series};
