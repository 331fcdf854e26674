use std::path::PathBuf;

use thiserror::Error;

/// Input problems the caller can fix and resubmit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("total tax base must be greater than zero")]
    NonPositiveBase,

    #[error(
        "investment earning ({investment:.2}) plus other earning ({other:.2}) exceeds the tax base ({base:.2})"
    )]
    BaseExceeded {
        investment: f64,
        other: f64,
        base: f64,
    },

    #[error("total pledged investment amount on the certificate is required")]
    MissingPledgedAmount,

    #[error("{field} must be a finite amount >= 0")]
    NegativeAmount { field: &'static str },

    #[error("{field}: '{value}' is not a valid amount")]
    MalformedAmount { field: &'static str, value: String },
}

impl ValidationError {
    /// Machine-readable code used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::NonPositiveBase => "NON_POSITIVE_BASE",
            ValidationError::BaseExceeded { .. } => "BASE_EXCEEDED",
            ValidationError::MissingPledgedAmount => "MISSING_PLEDGED_AMOUNT",
            ValidationError::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            ValidationError::MalformedAmount { .. } => "MALFORMED_AMOUNT",
        }
    }
}

/// Rate table problems. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read rate table {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rate table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rate table section '{0}' is empty")]
    EmptySection(&'static str),

    #[error("malformed legacy rate key '{0}' (expected <tier>_<var|yok>)")]
    InvalidKey(String),

    #[error("rate {rate} for '{key}' is outside 0..=100")]
    RateOutOfRange { key: String, rate: f64 },

    #[error("unknown program '{0}' in rate table")]
    UnknownProgram(String),

    #[error("province '{province}' has tier {tier}, expected 1..=6")]
    InvalidTier { province: String, tier: u8 },
}
