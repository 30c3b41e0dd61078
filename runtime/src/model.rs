//! Core record types shared by acquisition, reduction, and export.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value stored for any attribute the source did not provide.
pub const UNKNOWN: &str = "unknown";

/// Identifier assigned by the source service.
///
/// Unique within one region's result set only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacilityId {
    Num(i64),
    Text(String),
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacilityId::Num(n) => write!(f, "{n}"),
            FacilityId::Text(s) => f.write_str(s),
        }
    }
}

/// Geometry the record's coordinates were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    /// Standalone point with direct coordinates.
    Point,
    /// Center of a way outline.
    WayCentroid,
    /// Center of a multi-geometry relation.
    RelationCentroid,
}

impl FacilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityKind::Point => "point",
            FacilityKind::WayCentroid => "way_centroid",
            FacilityKind::RelationCentroid => "relation_centroid",
        }
    }
}

/// What kind of facility a pipeline run collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FacilityCategory {
    Parking,
    Charging,
}

impl FacilityCategory {
    /// Overpass tag `(key, value)` selecting this category.
    pub fn osm_tag(&self) -> (&'static str, &'static str) {
        match self {
            FacilityCategory::Parking => ("amenity", "parking"),
            FacilityCategory::Charging => ("amenity", "charging_station"),
        }
    }

    /// Tag keys copied into `FacilityRecord::attributes`, in export order.
    pub fn attribute_keys(&self) -> &'static [&'static str] {
        match self {
            FacilityCategory::Parking => &["access", "capacity", "fee"],
            FacilityCategory::Charging => &["access", "capacity", "fee", "network", "operator"],
        }
    }

    /// Label used when the source has no name for a facility.
    pub fn placeholder_name(&self, id: &FacilityId) -> String {
        match self {
            FacilityCategory::Parking => format!("Parking {id}"),
            FacilityCategory::Charging => format!("Charging Station {id}"),
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            FacilityCategory::Parking => "parking_lots",
            FacilityCategory::Charging => "charging_stations",
        }
    }
}

/// Region a record was fetched under, e.g. `Phoenix, AZ`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub region: String,
    pub sub_region: String,
}

impl GroupKey {
    pub fn new(region: impl Into<String>, sub_region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            sub_region: sub_region.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.region, self.sub_region)
    }
}

/// South/west/north/east rectangle in WGS-84 degrees.
///
/// Not validated; an inverted box just produces an empty result upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Overpass ordering: `south,west,north,east`.
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

/// One extraction request.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionQuery {
    pub region: String,
    pub sub_region: String,
    pub bbox: BoundingBox,
}

impl RegionQuery {
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.region, &self.sub_region)
    }
}

/// One normalized point of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityRecord {
    pub id: FacilityId,
    pub kind: FacilityKind,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub group_key: GroupKey,
}

impl FacilityRecord {
    /// Attribute value, or `"unknown"` when the key was never populated.
    pub fn attribute(&self, key: &str) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or(UNKNOWN)
    }

    pub fn coords(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// Output of the reducer: representatives in group order, then cluster order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReducedMarkerSet {
    pub markers: Vec<FacilityRecord>,
}

impl ReducedMarkerSet {
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FacilityRecord> {
        self.markers.iter()
    }

    /// Number of markers per group, in output order.
    pub fn counts_by_group(&self) -> Vec<(GroupKey, usize)> {
        let mut counts: Vec<(GroupKey, usize)> = Vec::new();
        for marker in &self.markers {
            match counts.last_mut() {
                Some((key, n)) if *key == marker.group_key => *n += 1,
                _ => counts.push((marker.group_key.clone(), 1)),
            }
        }
        counts
    }
}

impl From<Vec<FacilityRecord>> for ReducedMarkerSet {
    fn from(markers: Vec<FacilityRecord>) -> Self {
        Self { markers }
    }
}
