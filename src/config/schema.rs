//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the feed.
//! All types derive Serde traits for deserialization from config files, and
//! the defaults describe the full dashboard so no file is required.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// HTTP surface settings.
    pub server: ServerConfig,

    /// Deadlines for upstream calls.
    pub timeouts: TimeoutConfig,

    /// Immediate re-tries inside one provider attempt.
    pub retries: RetryConfig,

    /// Last-known-good cache policy.
    pub cache: CacheConfig,

    /// Pacing for batched upstream calls.
    pub throttle: ThrottleConfig,

    /// Names of the environment variables holding provider API keys.
    pub credentials: CredentialsConfig,

    /// Upstream base URLs.
    pub endpoints: EndpointConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Metric definitions, each with its fallback chain(s).
    pub metrics: Vec<MetricConfig>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            cache: CacheConfig::default(),
            throttle: ThrottleConfig::default(),
            credentials: CredentialsConfig::default(),
            endpoints: EndpointConfig::default(),
            observability: ObservabilityConfig::default(),
            metrics: default_metrics(),
        }
    }
}

impl FeedConfig {
    pub fn metric(&self, key: &str) -> Option<&MetricConfig> {
        self.metrics.iter().find(|m| m.key == key)
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Value of the `Access-Control-Allow-Origin` response header.
    pub allow_origin: String,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            allow_origin: "*".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for one provider attempt (fetch + parse, including re-tries).
    pub attempt_secs: u64,

    /// TCP connect timeout in seconds.
    pub connect_secs: u64,

    /// Single HTTP request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            attempt_secs: 10,
            connect_secs: 3,
            request_secs: 8,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total HTTP tries per provider attempt (1 disables re-tries).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 200,
            max_delay_ms: 1000,
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for metrics that do not set their own.
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 60 * 60,
        }
    }
}

/// Throttle configuration for batched upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Calls allowed in flight at once.
    pub concurrency: usize,

    /// Pause after each call before its slot is released, in milliseconds.
    pub delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            delay_ms: 100,
        }
    }
}

/// Environment variable names for provider API keys.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub fred_env: String,
    pub twelve_data_env: String,
    pub fmp_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            fred_env: "FRED_KEY".to_string(),
            twelve_data_env: "TWELVE_KEY".to_string(),
            fmp_env: "FMP_KEY".to_string(),
        }
    }
}

/// Upstream base URLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub fred: String,
    pub twelve_data: String,
    pub fmp: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            fred: "https://api.stlouisfed.org/fred".to_string(),
            twelve_data: "https://api.twelvedata.com".to_string(),
            fmp: "https://financialmodelingprep.com/api/v3".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// How a metric's value is produced from its chain(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Latest valid observation of one chain.
    Simple,
    /// `left / right * 100` over the latest jointly reported period.
    Ratio,
    /// `left - right` over the latest jointly reported period.
    Spread,
}

/// How the two legs are reconciled.
///
/// The calendar widths pick the newest period both legs report at that
/// width. `Latest` pairs the newest left value with the newest right value
/// whose period had begun by then, for spot values over lagging releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignTo {
    Day,
    Month,
    Quarter,
    Year,
    Latest,
}

/// One metric definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricConfig {
    /// Key used in responses and routes.
    pub key: String,

    /// Unit of the resolved value.
    pub unit: String,

    pub kind: MetricKind,

    /// Cache TTL in seconds (falls back to `cache.default_ttl_secs`).
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// Alignment width for ratio and spread metrics.
    #[serde(default = "default_align")]
    pub align: AlignTo,

    /// Provider chain of a simple metric.
    #[serde(default)]
    pub chain: Vec<ProviderConfig>,

    /// Numerator (ratio) or minuend (spread) chain.
    #[serde(default, alias = "numerator")]
    pub left: Vec<ProviderConfig>,

    /// Denominator (ratio) or subtrahend (spread) chain.
    #[serde(default, alias = "denominator")]
    pub right: Vec<ProviderConfig>,

    /// Optional label attached when the value crosses a threshold.
    #[serde(default)]
    pub flag: Option<FlagConfig>,
}

fn default_align() -> AlignTo {
    AlignTo::Year
}

/// Threshold label, e.g. `overvalued` above 120.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlagConfig {
    pub label: String,
    #[serde(default)]
    pub above: Option<f64>,
    #[serde(default)]
    pub below: Option<f64>,
}

/// Native frequency of a FRED series request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FredFrequency {
    #[serde(rename = "d")]
    Daily,
    #[serde(rename = "m")]
    Monthly,
    #[serde(rename = "q")]
    Quarterly,
    #[serde(rename = "a")]
    Annual,
}

impl FredFrequency {
    pub fn code(&self) -> &'static str {
        match self {
            FredFrequency::Daily => "d",
            FredFrequency::Monthly => "m",
            FredFrequency::Quarterly => "q",
            FredFrequency::Annual => "a",
        }
    }
}

/// One provider in a fallback chain.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// FRED series observations (JSON).
    Fred {
        series_id: String,
        unit: String,
        #[serde(default)]
        frequency: Option<FredFrequency>,
        #[serde(default)]
        observation_start: Option<String>,
        /// Request only the newest `limit` observations.
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    /// Twelve Data quote endpoint (JSON).
    TwelveData {
        symbol: String,
        unit: String,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    /// Financial Modeling Prep quote endpoint (JSON array).
    FmpQuote {
        symbol: String,
        unit: String,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    /// Sum of constituent market capitalisations from FMP profiles.
    FmpConstituents {
        symbols: Vec<String>,
        unit: String,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    /// Delimited-text daily history (CBOE, Stooq).
    Csv {
        id: String,
        url: String,
        unit: String,
        /// Zero-based close column; the last column when unset.
        #[serde(default)]
        close_column: Option<usize>,
        #[serde(default = "default_date_format")]
        date_format: String,
    },
}

fn unit_scale() -> f64 {
    1.0
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

impl ProviderConfig {
    /// Unit the provider reports in after scaling.
    pub fn unit(&self) -> &str {
        match self {
            ProviderConfig::Fred { unit, .. }
            | ProviderConfig::TwelveData { unit, .. }
            | ProviderConfig::FmpQuote { unit, .. }
            | ProviderConfig::FmpConstituents { unit, .. }
            | ProviderConfig::Csv { unit, .. } => unit,
        }
    }
}

fn fred(series_id: &str, unit: &str) -> ProviderConfig {
    ProviderConfig::Fred {
        series_id: series_id.to_string(),
        unit: unit.to_string(),
        frequency: None,
        observation_start: None,
        limit: Some(20),
        scale: 1.0,
    }
}

fn quote_pair(key: &str, symbol: &str) -> MetricConfig {
    simple(
        key,
        "USD",
        vec![
            ProviderConfig::TwelveData {
                symbol: symbol.to_string(),
                unit: "USD".to_string(),
                scale: 1.0,
            },
            ProviderConfig::FmpQuote {
                symbol: symbol.to_string(),
                unit: "USD".to_string(),
                scale: 1.0,
            },
        ],
    )
}

fn simple(key: &str, unit: &str, chain: Vec<ProviderConfig>) -> MetricConfig {
    MetricConfig {
        key: key.to_string(),
        unit: unit.to_string(),
        kind: MetricKind::Simple,
        ttl_secs: None,
        align: AlignTo::Year,
        chain,
        left: Vec::new(),
        right: Vec::new(),
        flag: None,
    }
}

/// Largest S&P 500 constituents used for the estimated market cap.
const TOP_CONSTITUENTS: [&str; 15] = [
    "AAPL", "MSFT", "NVDA", "GOOGL", "AMZN", "BRK-B", "META", "TSLA", "UNH", "JNJ", "V", "PG",
    "MA", "XOM", "JPM",
];

/// S&P 500 capitalisation to total US market capitalisation.
const SP500_TO_TOTAL: f64 = 1.30;

/// SPY shares outstanding, used to turn a SPY price into an index market cap.
const SPY_SHARES_OUTSTANDING: f64 = 1_024_000_000.0;

fn default_metrics() -> Vec<MetricConfig> {
    let overvalued = Some(FlagConfig {
        label: "overvalued".to_string(),
        above: Some(120.0),
        below: None,
    });

    let buffett = MetricConfig {
        key: "buffett".to_string(),
        unit: "%".to_string(),
        kind: MetricKind::Ratio,
        ttl_secs: Some(6 * 60 * 60),
        align: AlignTo::Year,
        chain: Vec::new(),
        left: vec![ProviderConfig::Fred {
            series_id: "NCBEILQ027S".to_string(),
            unit: "USD bn".to_string(),
            frequency: Some(FredFrequency::Quarterly),
            observation_start: Some("1980-01-01".to_string()),
            limit: None,
            // Reported in millions.
            scale: 0.001,
        }],
        right: vec![ProviderConfig::Fred {
            series_id: "GDP".to_string(),
            unit: "USD bn".to_string(),
            frequency: Some(FredFrequency::Annual),
            observation_start: Some("1980-01-01".to_string()),
            limit: None,
            scale: 1.0,
        }],
        flag: overvalued.clone(),
    };

    let estimated_buffett = MetricConfig {
        key: "estimated_buffett".to_string(),
        unit: "%".to_string(),
        kind: MetricKind::Ratio,
        ttl_secs: Some(30 * 60),
        align: AlignTo::Latest,
        chain: Vec::new(),
        left: vec![
            ProviderConfig::FmpConstituents {
                symbols: TOP_CONSTITUENTS.iter().map(|s| s.to_string()).collect(),
                unit: "USD bn".to_string(),
                scale: SP500_TO_TOTAL / 1e9,
            },
            ProviderConfig::TwelveData {
                symbol: "SPY".to_string(),
                unit: "USD bn".to_string(),
                scale: SPY_SHARES_OUTSTANDING * SP500_TO_TOTAL / 1e9,
            },
        ],
        right: vec![ProviderConfig::Fred {
            series_id: "GDP".to_string(),
            unit: "USD bn".to_string(),
            frequency: Some(FredFrequency::Quarterly),
            observation_start: None,
            limit: Some(12),
            scale: 1.0,
        }],
        flag: overvalued,
    };

    let gold = simple(
        "gold",
        "USD/oz",
        vec![
            fred("GOLDPMGBD228NLBM", "USD/oz"),
            fred("GOLDAMGBD228NLBM", "USD/oz"),
            ProviderConfig::TwelveData {
                symbol: "XAU/USD".to_string(),
                unit: "USD/oz".to_string(),
                scale: 1.0,
            },
            ProviderConfig::FmpQuote {
                symbol: "GC=F".to_string(),
                unit: "USD/oz".to_string(),
                scale: 1.0,
            },
        ],
    );

    let mut vix = simple(
        "vix",
        "points",
        vec![
            ProviderConfig::Fred {
                series_id: "VIXCLS".to_string(),
                unit: "points".to_string(),
                frequency: None,
                observation_start: None,
                limit: Some(10),
                scale: 1.0,
            },
            ProviderConfig::FmpQuote {
                symbol: "^VIX".to_string(),
                unit: "points".to_string(),
                scale: 1.0,
            },
            ProviderConfig::Csv {
                id: "cboe:VIX".to_string(),
                url: "https://cdn.cboe.com/api/global/us_indices/daily_prices/VIX_History.csv"
                    .to_string(),
                unit: "points".to_string(),
                close_column: None,
                date_format: "%m/%d/%Y".to_string(),
            },
            ProviderConfig::Csv {
                id: "stooq:^vix".to_string(),
                url: "https://stooq.com/q/d/l/?s=%5Evix&i=d".to_string(),
                unit: "points".to_string(),
                close_column: Some(4),
                date_format: "%Y-%m-%d".to_string(),
            },
        ],
    );
    vix.ttl_secs = Some(6 * 60 * 60);

    let yield_spread = MetricConfig {
        key: "yield_spread".to_string(),
        unit: "pp".to_string(),
        kind: MetricKind::Spread,
        ttl_secs: None,
        align: AlignTo::Day,
        chain: Vec::new(),
        left: vec![ProviderConfig::Fred {
            series_id: "DGS10".to_string(),
            unit: "%".to_string(),
            frequency: None,
            observation_start: None,
            limit: Some(10),
            scale: 1.0,
        }],
        right: vec![ProviderConfig::Fred {
            series_id: "DGS2".to_string(),
            unit: "%".to_string(),
            frequency: None,
            observation_start: None,
            limit: Some(10),
            scale: 1.0,
        }],
        flag: Some(FlagConfig {
            label: "inverted".to_string(),
            above: None,
            below: Some(0.0),
        }),
    };

    let dxy = simple(
        "dxy",
        "index",
        vec![ProviderConfig::Fred {
            series_id: "DTWEXBGS".to_string(),
            unit: "index".to_string(),
            frequency: None,
            observation_start: None,
            limit: Some(20),
            scale: 1.0,
        }],
    );

    vec![
        buffett,
        estimated_buffett,
        gold,
        vix,
        yield_spread,
        dxy,
        quote_pair("spy", "SPY"),
        quote_pair("vixy", "VIXY"),
        quote_pair("tsla", "TSLA"),
        quote_pair("lit", "LIT"),
    ]
}
