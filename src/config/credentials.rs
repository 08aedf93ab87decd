//! Provider API keys.
//!
//! Keys are looked up by provider kind at fetch time, never stored in the
//! config file. A missing or empty key is a configuration failure for that
//! provider only; the chain moves on to the next one.

use std::collections::HashMap;

use crate::config::schema::CredentialsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Fred,
    TwelveData,
    Fmp,
}

pub trait CredentialSource: Send + Sync {
    fn get(&self, kind: CredentialKind) -> Option<String>;
}

/// Reads keys from the environment variables named in the config.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    names: CredentialsConfig,
}

impl EnvCredentials {
    pub fn new(names: CredentialsConfig) -> Self {
        Self { names }
    }
}

impl CredentialSource for EnvCredentials {
    fn get(&self, kind: CredentialKind) -> Option<String> {
        let var = match kind {
            CredentialKind::Fred => &self.names.fred_env,
            CredentialKind::TwelveData => &self.names.twelve_data_env,
            CredentialKind::Fmp => &self.names.fmp_env,
        };
        std::env::var(var).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed keys, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<CredentialKind, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: CredentialKind, key: impl Into<String>) -> Self {
        self.keys.insert(kind, key.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, kind: CredentialKind) -> Option<String> {
        self.keys.get(&kind).filter(|v| !v.is_empty()).cloned()
    }
}
