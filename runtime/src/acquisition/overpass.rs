//! Overpass API source for OpenStreetMap facilities.
//!
//! Responses are decoded into transport DTOs first and then normalized into
//! `FacilityRecord`s. Elements are decoded one at a time so a single odd
//! element is skipped instead of failing the whole region.

use super::http_client::HttpClient;
use super::{attribute_text, FacilitySource};
use crate::error::ExtractError;
use crate::model::{
    FacilityCategory, FacilityId, FacilityKind, FacilityRecord, GroupKey, RegionQuery,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct OverpassResponseDto {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OverpassElementDto {
    #[serde(rename = "type", default)]
    element_type: String,
    id: FacilityId,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenterDto>,
    #[serde(default)]
    tags: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenterDto {
    lat: f64,
    lon: f64,
}

impl OverpassElementDto {
    /// Direct coordinates win; ways and relations fall back to their center.
    fn coordinates(&self) -> Option<(f64, f64)> {
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            return Some((lat, lon));
        }
        self.center.as_ref().map(|c| (c.lat, c.lon))
    }

    fn kind(&self) -> FacilityKind {
        match self.element_type.as_str() {
            "way" => FacilityKind::WayCentroid,
            "relation" => FacilityKind::RelationCentroid,
            _ => FacilityKind::Point,
        }
    }

    fn into_record(self, category: FacilityCategory, group_key: &GroupKey) -> Option<FacilityRecord> {
        let (latitude, longitude) = self.coordinates()?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }

        let kind = self.kind();
        let tags = self.tags;
        let name = match tags.get("name") {
            Some(Value::String(n)) if !n.trim().is_empty() => n.clone(),
            Some(n @ Value::Number(_)) => n.to_string(),
            _ => category.placeholder_name(&self.id),
        };

        let attributes = category
            .attribute_keys()
            .iter()
            .map(|&key| (key.to_string(), attribute_text(tags.get(key))))
            .collect();

        Some(FacilityRecord {
            id: self.id,
            kind,
            latitude,
            longitude,
            name,
            attributes,
            group_key: group_key.clone(),
        })
    }
}

/// Build the Overpass QL query for one bounding box.
///
/// Requests nodes, ways, and relations carrying the category tag, with
/// `out center` so ways and relations come back with a center point.
pub fn build_query(category: FacilityCategory, query: &RegionQuery, timeout_secs: u64) -> String {
    let (key, value) = category.osm_tag();
    let bbox = query.bbox.to_overpass();
    format!(
        "[out:json][timeout:{timeout_secs}];\n\
         (\n  \
           node[\"{key}\"=\"{value}\"]({bbox});\n  \
           way[\"{key}\"=\"{value}\"]({bbox});\n  \
           relation[\"{key}\"=\"{value}\"]({bbox});\n\
         );\n\
         out center;\n"
    )
}

/// Decode an Overpass JSON body into normalized records.
///
/// Elements with neither coordinates nor a center are dropped, as are
/// elements that do not match the expected shape.
pub fn parse_response(
    body: &str,
    category: FacilityCategory,
    group_key: &GroupKey,
) -> Result<Vec<FacilityRecord>, ExtractError> {
    let response: OverpassResponseDto = serde_json::from_str(body)?;
    let total = response.elements.len();

    let records: Vec<FacilityRecord> = response
        .elements
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<OverpassElementDto>(value) {
            Ok(element) => element.into_record(category, group_key),
            Err(e) => {
                debug!("skipping malformed element: {e}");
                None
            }
        })
        .collect();

    if records.len() < total {
        debug!(
            "{group_key}: skipped {} of {total} elements without usable coordinates",
            total - records.len()
        );
    }

    Ok(records)
}

/// Facility source backed by an Overpass interpreter endpoint.
pub struct OverpassSource {
    client: HttpClient,
    endpoint: String,
    category: FacilityCategory,
    timeout_secs: u64,
}

impl OverpassSource {
    pub fn new(
        client: HttpClient,
        endpoint: impl Into<String>,
        category: FacilityCategory,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            category,
            timeout_secs,
        }
    }
}

#[async_trait]
impl FacilitySource for OverpassSource {
    fn name(&self) -> &str {
        "overpass"
    }

    fn attribute_keys(&self) -> &[&'static str] {
        self.category.attribute_keys()
    }

    async fn fetch(&self, query: &RegionQuery) -> Result<Vec<FacilityRecord>, ExtractError> {
        let ql = build_query(self.category, query, self.timeout_secs);
        let resp = self.client.post_text(&self.endpoint, ql).await?;
        if !resp.is_success() {
            return Err(ExtractError::Status(resp.status));
        }
        parse_response(&resp.body, self.category, &query.group_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, UNKNOWN};

    fn key() -> GroupKey {
        GroupKey::new("Tampa", "FL")
    }

    #[test]
    fn test_build_query() {
        let query = RegionQuery {
            region: "Tampa".into(),
            sub_region: "FL".into(),
            bbox: BoundingBox::new(27.9, -82.55, 28.15, -82.35),
        };
        let ql = build_query(FacilityCategory::Parking, &query, 180);

        assert!(ql.starts_with("[out:json][timeout:180];"));
        assert!(ql.contains("node[\"amenity\"=\"parking\"](27.9,-82.55,28.15,-82.35);"));
        assert!(ql.contains("way[\"amenity\"=\"parking\"](27.9,-82.55,28.15,-82.35);"));
        assert!(ql.contains("relation[\"amenity\"=\"parking\"](27.9,-82.55,28.15,-82.35);"));
        assert!(ql.trim_end().ends_with("out center;"));
    }

    #[test]
    fn test_build_query_charging_tag() {
        let query = RegionQuery {
            region: "Tampa".into(),
            sub_region: "FL".into(),
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        };
        let ql = build_query(FacilityCategory::Charging, &query, 60);
        assert!(ql.contains("node[\"amenity\"=\"charging_station\"](0,0,1,1);"));
    }

    #[test]
    fn test_parse_node_way_relation() {
        let body = r#"{"elements":[
            {"type":"node","id":1,"lat":27.95,"lon":-82.45,"tags":{"name":"Garage A","capacity":"300","fee":"yes"}},
            {"type":"way","id":2,"center":{"lat":27.96,"lon":-82.46},"tags":{"access":"customers"}},
            {"type":"relation","id":3,"center":{"lat":27.97,"lon":-82.47}}
        ]}"#;

        let records = parse_response(body, FacilityCategory::Parking, &key()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].kind, FacilityKind::Point);
        assert_eq!(records[0].name, "Garage A");
        assert_eq!(records[0].attribute("capacity"), "300");
        assert_eq!(records[0].attribute("access"), UNKNOWN);

        assert_eq!(records[1].kind, FacilityKind::WayCentroid);
        assert_eq!(records[1].latitude, 27.96);
        assert_eq!(records[1].name, "Parking 2");
        assert_eq!(records[1].attribute("access"), "customers");

        assert_eq!(records[2].kind, FacilityKind::RelationCentroid);
        assert_eq!(records[2].group_key, key());
    }

    #[test]
    fn test_empty_tags_use_placeholders() {
        let body = r#"{"elements":[{"type":"node","id":42,"lat":1.0,"lon":2.0,"tags":{}}]}"#;
        let records = parse_response(body, FacilityCategory::Parking, &key()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Parking 42");
        assert_eq!(records[0].attributes.len(), 3);
        assert!(records[0].attributes.values().all(|v| v == UNKNOWN));
    }

    #[test]
    fn test_elements_without_coordinates_skipped() {
        let body = r#"{"elements":[
            {"type":"way","id":7,"tags":{"name":"No center"}},
            {"type":"node","id":8,"lat":1.0,"tags":{}},
            {"type":"relation","id":9},
            {"type":"node","id":10,"lat":1.0,"lon":2.0}
        ]}"#;
        let records = parse_response(body, FacilityCategory::Parking, &key()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, FacilityId::Num(10));
    }

    #[test]
    fn test_malformed_element_skipped() {
        let body = r#"{"elements":[
            {"type":"node","lat":1.0,"lon":2.0},
            "garbage",
            {"type":"node","id":11,"lat":1.0,"lon":2.0}
        ]}"#;
        let records = parse_response(body, FacilityCategory::Parking, &key()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_elements_is_empty() {
        let records = parse_response("{}", FacilityCategory::Parking, &key()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let err = parse_response("<html>rate limited</html>", FacilityCategory::Parking, &key())
            .unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }

    #[test]
    fn test_blank_name_uses_placeholder() {
        let body = r#"{"elements":[{"type":"node","id":5,"lat":1.0,"lon":2.0,"tags":{"name":"  "}}]}"#;
        let records = parse_response(body, FacilityCategory::Charging, &key()).unwrap();
        assert_eq!(records[0].name, "Charging Station 5");
        assert_eq!(records[0].attributes.len(), 5);
    }

    #[test]
    fn test_non_string_tag_values_kept() {
        let body = r#"{"elements":[
            {"type":"node","id":1,"lat":1.0,"lon":2.0,"tags":{"capacity":120,"fee":false,"name":7}}
        ]}"#;
        let records = parse_response(body, FacilityCategory::Parking, &key()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attribute("capacity"), "120");
        assert_eq!(records[0].attribute("fee"), "false");
        assert_eq!(records[0].name, "7");
    }

    #[test]
    fn test_missing_type_is_point() {
        let body = r#"{"elements":[{"id":2,"lat":1.0,"lon":2.0,"tags":{"name":"Lot"}}]}"#;
        let records = parse_response(body, FacilityCategory::Parking, &key()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, FacilityKind::Point);
        assert_eq!(records[0].name, "Lot");
    }
}
