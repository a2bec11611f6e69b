use std::fmt;

use crate::RedactionSet;

/// Default retained body size per direction.
pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 250_000;

pub const MAX_CONTENT_LENGTH_ENV: &str = "CALLSCOPE_MAX_CONTENT_LENGTH";
pub const REDACT_HEADERS_ENV: &str = "CALLSCOPE_REDACT_HEADERS";

/// Immutable capture settings shared by every intercepted call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    pub max_content_length: u64,
    pub redact_headers: RedactionSet,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            redact_headers: RedactionSet::default(),
        }
    }
}

impl CaptureConfig {
    pub fn with_max_content_length(mut self, max_content_length: u64) -> Self {
        self.max_content_length = max_content_length;
        self
    }

    pub fn redact_header(mut self, name: impl AsRef<str>) -> Self {
        self.redact_headers.insert(name);
        self
    }

    pub fn redact_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.redact_headers.insert(name);
        }
        self
    }

    /// Defaults overridden by `CALLSCOPE_MAX_CONTENT_LENGTH` and
    /// `CALLSCOPE_REDACT_HEADERS` (comma-separated).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_CONTENT_LENGTH_ENV) {
            config.max_content_length = raw.trim().parse().map_err(|_| {
                ConfigError::InvalidNumber {
                    var: MAX_CONTENT_LENGTH_ENV,
                    value: raw.clone(),
                }
            })?;
        }

        if let Some(raw) = lookup(REDACT_HEADERS_ENV) {
            config = config.redact_headers(parse_header_list(&raw));
        }

        Ok(config)
    }
}

/// Splits a comma-separated header list, dropping blanks.
pub fn parse_header_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumber { var, value } => {
                write!(f, "{var} must be a non-negative integer, got {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
