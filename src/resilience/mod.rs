//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Provider attempt:
//!     → timeouts.rs (per-attempt deadline set by the fallback resolver)
//!     → retries.rs (is this HTTP failure transient?)
//!     → backoff.rs (jittered delay before the next immediate re-try)
//!
//! Batch upstream calls (constituent profiles):
//!     → throttle.rs (bounded concurrency + inter-call delay)
//! ```
//!
//! # Design Decisions
//! - Every provider attempt has a deadline; a timeout is an ordinary failure
//! - Re-tries inside one provider are few and short; switching providers is
//!   the fallback chain's job
//! - Throttling is a reusable utility, not a per-call-site loop

pub mod backoff;
pub mod retries;
pub mod throttle;
pub mod timeouts;
