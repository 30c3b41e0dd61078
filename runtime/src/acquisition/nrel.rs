//! NREL Alternative Fuel Stations source for EV charging stations.
//!
//! The API is queried per state; stations are then narrowed to the region's
//! city by name. The bounding box is not used.

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

/// Attribute columns taken from each station, in export order.
pub const NREL_ATTRIBUTE_KEYS: &[&str] = &[
    "ev_connector_types",
    "ev_network",
    "ev_dc_fast_num",
    "ev_level2_evse_num",
    "zip",
];

#[derive(Debug, Deserialize)]
struct StationsResponseDto {
    #[serde(default)]
    fuel_stations: Vec<BTreeMap<String, Value>>,
}

fn station_id(station: &BTreeMap<String, Value>) -> Option<FacilityId> {
    match station.get("id")? {
        Value::Number(n) => n.as_i64().map(FacilityId::Num),
        Value::String(s) => Some(FacilityId::Text(s.clone())),
        _ => None,
    }
}

fn normalize_station(station: BTreeMap<String, Value>, group_key: &GroupKey) -> Option<FacilityRecord> {
    let latitude = station.get("latitude").and_then(Value::as_f64)?;
    let longitude = station.get("longitude").and_then(Value::as_f64)?;
    let id = station_id(&station)?;

    let name = match station.get("station_name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => FacilityCategory::Charging.placeholder_name(&id),
    };

    let attributes = NREL_ATTRIBUTE_KEYS
        .iter()
        .map(|&key| (key.to_string(), attribute_text(station.get(key))))
        .collect();

    Some(FacilityRecord {
        id,
        kind: FacilityKind::Point,
        latitude,
        longitude,
        name,
        attributes,
        group_key: group_key.clone(),
    })
}

/// Keep stations in the query's city and normalize them.
pub fn parse_response(body: &str, query: &RegionQuery) -> Result<Vec<FacilityRecord>, ExtractError> {
    let response: StationsResponseDto = serde_json::from_str(body)?;
    let city = query.region.to_lowercase();
    let key = query.group_key();

    Ok(response
        .fuel_stations
        .into_iter()
        .filter(|s| {
            s.get("city")
                .and_then(Value::as_str)
                .is_some_and(|c| c.trim().to_lowercase() == city)
        })
        .filter_map(|s| normalize_station(s, &key))
        .collect())
}

/// Facility source backed by the NREL station locator API.
pub struct NrelSource {
    client: HttpClient,
    endpoint: String,
    api_key: String,
    limit: u32,
}

impl NrelSource {
    pub fn new(client: HttpClient, endpoint: impl Into<String>, api_key: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            limit,
        }
    }
}

#[async_trait]
impl FacilitySource for NrelSource {
    fn name(&self) -> &str {
        "nrel"
    }

    fn attribute_keys(&self) -> &[&'static str] {
        NREL_ATTRIBUTE_KEYS
    }

    async fn fetch(&self, query: &RegionQuery) -> Result<Vec<FacilityRecord>, ExtractError> {
        let params = [
            ("api_key", self.api_key.clone()),
            ("fuel_type", "ELEC".to_string()),
            ("state", query.sub_region.clone()),
            ("limit", self.limit.to_string()),
        ];
        let resp = self.client.get_query(&self.endpoint, &params).await?;
        if !resp.is_success() {
            return Err(ExtractError::Status(resp.status));
        }
        parse_response(&resp.body, query)
    }
}
