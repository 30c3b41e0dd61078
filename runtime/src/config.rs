//! Region table and pipeline settings.
//!
//! Regions are data, not code: each entry carries its bounding box and the
//! density divisor used when thinning its markers. The table is read from a
//! JSON file when one is available and falls back to the built-in cities.

use crate::error::{PipelineError, Result};
use crate::model::{BoundingBox, FacilityCategory, GroupKey, RegionQuery};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_NREL_URL: &str = "https://developer.nrel.gov/api/alt-fuel-stations/v1.json";
pub const NREL_KEY_ENV: &str = "NREL_API_KEY";

/// Root for user-level files, `$LOTMAP_HOME` or `~/.lotmap`.
pub fn lotmap_home() -> PathBuf {
    if let Ok(p) = std::env::var("LOTMAP_HOME") {
        return PathBuf::from(p);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".lotmap")
}

/// One configured region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// City or area name, e.g. `Phoenix`.
    pub name: String,
    /// Two-letter state or province code, e.g. `AZ`.
    pub sub_region: String,
    pub bbox: BoundingBox,
    /// Show roughly one marker per `divisor` facilities.
    pub divisor: usize,
}

impl RegionConfig {
    pub fn new(name: &str, sub_region: &str, bbox: BoundingBox, divisor: usize) -> Self {
        Self {
            name: name.to_string(),
            sub_region: sub_region.to_string(),
            bbox,
            divisor,
        }
    }

    pub fn query(&self) -> RegionQuery {
        RegionQuery {
            region: self.name.clone(),
            sub_region: self.sub_region.clone(),
            bbox: self.bbox,
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.name, &self.sub_region)
    }
}

/// Ordered list of regions to process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionTable {
    pub regions: Vec<RegionConfig>,
}

impl Default for RegionTable {
    fn default() -> Self {
        Self {
            regions: vec![
                RegionConfig::new("Phoenix", "AZ", BoundingBox::new(33.2, -112.3, 33.8, -111.9), 160),
                RegionConfig::new("Tampa", "FL", BoundingBox::new(27.9, -82.55, 28.15, -82.35), 40),
                RegionConfig::new("Atlanta", "GA", BoundingBox::new(33.65, -84.55, 33.9, -84.25), 80),
            ],
        }
    }
}

impl RegionTable {
    /// Load from `path`, else `~/.lotmap/regions.json`, else the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let default_path = lotmap_home().join("regions.json");
        if default_path.exists() {
            return Self::from_file(&default_path);
        }

        debug!("no region file found, using built-in table");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table: RegionTable = serde_json::from_str(&content)?;
        info!(
            "loaded {} region(s) from {}",
            table.regions.len(),
            path.display()
        );
        Ok(table)
    }

    /// Reject tables the pipeline cannot run: no regions, a zero divisor, or
    /// the same region listed twice.
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(PipelineError::NoRegions);
        }
        if let Some(bad) = self.regions.iter().find(|r| r.divisor == 0) {
            return Err(PipelineError::InvalidDivisor {
                region: bad.group_key().to_string(),
            });
        }

        let mut seen = HashSet::new();
        for region in &self.regions {
            let key = region.group_key();
            if !seen.insert(key.clone()) {
                return Err(PipelineError::DuplicateRegion {
                    region: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Divisor configured for a group. The first matching region wins.
    pub fn divisor_for(&self, key: &GroupKey) -> Option<usize> {
        self.regions
            .iter()
            .find(|r| r.name == key.region && r.sub_region == key.sub_region)
            .map(|r| r.divisor)
    }
}

/// Settings for the NREL charging-station source.
#[derive(Debug, Clone, PartialEq)]
pub struct NrelConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub limit: u32,
}

impl Default for NrelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_NREL_URL.to_string(),
            api_key: std::env::var(NREL_KEY_ENV).ok().filter(|k| !k.is_empty()),
            limit: 200,
        }
    }
}

impl NrelConfig {
    pub fn require_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(PipelineError::MissingApiKey {
                env_var: NREL_KEY_ENV,
            })
    }
}

/// Settings that apply to a whole pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub category: FacilityCategory,
    /// Minimum pause between consecutive outbound queries.
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub seed: u64,
    /// Number of k-means restarts; the lowest-inertia run is kept.
    pub restarts: usize,
    pub overpass_endpoint: String,
    pub nrel: NrelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            category: FacilityCategory::Parking,
            request_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(180),
            seed: 42,
            restarts: 10,
            overpass_endpoint: std::env::var("LOTMAP_OVERPASS_URL")
                .unwrap_or_else(|_| DEFAULT_OVERPASS_URL.to_string()),
            nrel: NrelConfig::default(),
        }
    }
}

/// Parse an endpoint, mapping failures into a configuration error.
pub fn parse_endpoint(endpoint: &str) -> Result<url::Url> {
    url::Url::parse(endpoint).map_err(|source| PipelineError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        source,
    })
}
