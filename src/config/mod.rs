//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), or the built-in dashboard
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FeedConfig (validated, immutable)
//!     → providers and resolvers built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - API keys come from the environment, never the file

pub mod credentials;
pub mod loader;
pub mod schema;
pub mod validation;

pub use credentials::{CredentialKind, CredentialSource, EnvCredentials, StaticCredentials};
pub use loader::{load_config, load_or_default, parse_config, ConfigError};
pub use schema::{
    AlignTo, CacheConfig, CredentialsConfig, EndpointConfig, FeedConfig, FlagConfig,
    FredFrequency, MetricConfig, MetricKind, ObservabilityConfig, ProviderConfig, RetryConfig,
    ServerConfig, ThrottleConfig, TimeoutConfig,
};
