//! Error types for extraction and pipeline orchestration.

use thiserror::Error;

/// Failure while fetching one region. Never escapes `acquisition::extract`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors surfaced to the caller of the pipeline or exporters.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no regions configured")]
    NoRegions,

    #[error("density divisor for {region} must be positive")]
    InvalidDivisor { region: String },

    #[error("region {region} is listed more than once")]
    DuplicateRegion { region: String },

    #[error("no density divisor configured for {group}")]
    UnknownGroup { group: String },

    #[error("{source_name} source does not provide {category:?} facilities")]
    UnsupportedCategory {
        source_name: &'static str,
        category: crate::model::FacilityCategory,
    },

    #[error("missing API key: set {env_var} or pass it in the config")]
    MissingApiKey { env_var: &'static str },

    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
