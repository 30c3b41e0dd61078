//! Facility acquisition: query a geodata service for one region and
//! normalize its answer into `FacilityRecord`s.

pub mod http_client;
pub mod nrel;
pub mod overpass;
pub mod rate_limiter;

use crate::config::{parse_endpoint, PipelineConfig};
use crate::error::{ExtractError, PipelineError, Result};
use crate::model::{FacilityCategory, FacilityRecord, RegionQuery, UNKNOWN};
use async_trait::async_trait;
use http_client::HttpClient;
use nrel::NrelSource;
use overpass::OverpassSource;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Which upstream service to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    /// OpenStreetMap via the Overpass API (parking or charging).
    Overpass,
    /// NREL Alternative Fuel Stations (charging only).
    Nrel,
}

/// A service that can list facilities for a region.
#[async_trait]
pub trait FacilitySource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Attribute keys every record from this source carries, in export order.
    fn attribute_keys(&self) -> &[&'static str];

    /// Fetch and normalize one region.
    async fn fetch(&self, query: &RegionQuery) -> Result<Vec<FacilityRecord>, ExtractError>;
}

/// Render a JSON tag or field value as a flat string.
///
/// Absent, null, blank and empty-array values become `"unknown"`; arrays are
/// joined with `", "`.
pub(crate) fn attribute_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNKNOWN.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => UNKNOWN.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) if items.is_empty() => UNKNOWN.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

/// Build a source from configuration.
///
/// Checks endpoints, API keys, and category support up front so a bad
/// configuration fails before any request is sent.
pub fn build_source(kind: SourceKind, config: &PipelineConfig) -> Result<Arc<dyn FacilitySource>> {
    let client = HttpClient::new(config.request_timeout)?;

    match kind {
        SourceKind::Overpass => {
            parse_endpoint(&config.overpass_endpoint)?;
            Ok(Arc::new(OverpassSource::new(
                client,
                config.overpass_endpoint.clone(),
                config.category,
                config.request_timeout.as_secs(),
            )))
        }
        SourceKind::Nrel => {
            if config.category != FacilityCategory::Charging {
                return Err(PipelineError::UnsupportedCategory {
                    source_name: "nrel",
                    category: config.category,
                });
            }
            parse_endpoint(&config.nrel.endpoint)?;
            let key = config.nrel.require_key()?;
            Ok(Arc::new(NrelSource::new(
                client,
                config.nrel.endpoint.clone(),
                key,
                config.nrel.limit,
            )))
        }
    }
}

/// Fetch one region, converting any failure into an empty result.
///
/// Failure for one region must not abort the others, so errors are only
/// reported through tracing.
pub async fn extract(source: &dyn FacilitySource, query: &RegionQuery) -> Vec<FacilityRecord> {
    let key = query.group_key();
    info!("extracting {key} from {}", source.name());

    match source.fetch(query).await {
        Ok(records) => {
            if records.is_empty() {
                info!("no facilities found for {key}");
            } else {
                info!("found {} facilities in {key}", records.len());
            }
            records
        }
        Err(e) => {
            warn!("extraction failed for {key}: {e}");
            Vec::new()
        }
    }
}
