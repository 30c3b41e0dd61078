//! Leaflet map document for a reduced marker set.
//!
//! Each group becomes a toggleable layer. Markers start red and turn green
//! once clicked. Marker data is embedded as JSON and built client-side.

use crate::model::{FacilityRecord, ReducedMarkerSet, UNKNOWN};
use chrono::Utc;
use serde::Serialize;

/// Map center used when there is nothing to show (continental US).
pub const DEFAULT_CENTER: (f64, f64) = (39.8283, -98.5795);
pub const DEFAULT_ZOOM: u8 = 10;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>__TITLE__</title>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <style>
        html, body { height: 100%; margin: 0; }
        #map { height: 100%; width: 100%; }
    </style>
</head>
<body>
<!-- generated by lotmap __VERSION__ at __GENERATED__ -->
<div id="map"></div>
<script>
    var map = L.map('map').setView(__CENTER__, __ZOOM__);
    L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
        maxZoom: 19,
        attribution: '&copy; OpenStreetMap contributors'
    }).addTo(map);

    function colorIcon(color) {
        return L.icon({
            iconUrl: 'https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-2x-' + color + '.png',
            shadowUrl: 'https://unpkg.com/leaflet@1.9.4/dist/images/marker-shadow.png',
            iconSize: [25, 41],
            iconAnchor: [12, 41],
            popupAnchor: [1, -34],
            shadowSize: [41, 41]
        });
    }
    var redIcon = colorIcon('red');
    var greenIcon = colorIcon('green');

    var groups = __GROUPS__;
    var markers = __MARKERS__;

    var layers = {};
    groups.forEach(function (name) {
        layers[name] = L.layerGroup().addTo(map);
    });
    markers.forEach(function (m) {
        L.marker([m.lat, m.lon], { icon: redIcon })
            .bindPopup(m.popup, { maxWidth: 300 })
            .on('click', function () { this.setIcon(greenIcon); })
            .addTo(layers[m.group]);
    });
    L.control.layers(null, layers).addTo(map);
</script>
</body>
</html>
"#;

#[derive(Serialize)]
struct MarkerData {
    lat: f64,
    lon: f64,
    group: String,
    popup: String,
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Display labels for attribute keys whose title-cased form reads badly.
const ATTRIBUTE_LABELS: &[(&str, &str)] = &[
    ("ev_connector_types", "Connector Types"),
    ("ev_network", "Network"),
    ("ev_dc_fast_num", "DC Fast Chargers"),
    ("ev_level2_evse_num", "Level 2 Chargers"),
    ("zip", "ZIP Code"),
];

/// Popup label for an attribute key: a known label, else the key title-cased
/// (`max_stay` -> `Max Stay`).
fn attribute_label(key: &str) -> String {
    if let Some((_, label)) = ATTRIBUTE_LABELS.iter().find(|(k, _)| *k == key) {
        return label.to_string();
    }
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Popup HTML: name, group, then every attribute that is known.
pub fn popup_html(record: &FacilityRecord, attribute_keys: &[&str]) -> String {
    let mut html = format!(
        "<b>{}</b><br>City: {}",
        escape_html(&record.name),
        escape_html(&record.group_key.to_string())
    );
    for key in attribute_keys {
        let value = record.attribute(key);
        if value != UNKNOWN {
            html.push_str(&format!(
                "<br>{}: {}",
                attribute_label(key),
                escape_html(value)
            ));
        }
    }
    html
}

/// Mean coordinate of the markers, or `DEFAULT_CENTER` when empty.
pub fn map_center(markers: &ReducedMarkerSet) -> (f64, f64) {
    if markers.is_empty() {
        return DEFAULT_CENTER;
    }
    let n = markers.len() as f64;
    let (lat, lon) = markers
        .iter()
        .fold((0.0, 0.0), |(a, b), m| (a + m.latitude, b + m.longitude));
    (lat / n, lon / n)
}

/// JSON that is safe inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Render the full HTML document.
pub fn render_map(
    markers: &ReducedMarkerSet,
    attribute_keys: &[&str],
    title: &str,
) -> serde_json::Result<String> {
    let groups: Vec<String> = markers
        .counts_by_group()
        .into_iter()
        .map(|(key, _)| key.to_string())
        .collect();

    let data: Vec<MarkerData> = markers
        .iter()
        .map(|m| MarkerData {
            lat: m.latitude,
            lon: m.longitude,
            group: m.group_key.to_string(),
            popup: popup_html(m, attribute_keys),
        })
        .collect();

    let (lat, lon) = map_center(markers);

    Ok(TEMPLATE
        .replace("__TITLE__", &escape_html(title))
        .replace("__VERSION__", env!("CARGO_PKG_VERSION"))
        .replace("__GENERATED__", &Utc::now().to_rfc3339())
        .replace("__CENTER__", &format!("[{lat}, {lon}]"))
        .replace("__ZOOM__", &DEFAULT_ZOOM.to_string())
        .replace("__GROUPS__", &script_json(&groups)?)
        .replace("__MARKERS__", &script_json(&data)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FacilityId, FacilityKind, GroupKey};
    use std::collections::BTreeMap;

    fn record(id: i64, lat: f64, lon: f64, group: &str) -> FacilityRecord {
        let mut attributes = BTreeMap::new();
        attributes.insert("capacity".to_string(), "250".to_string());
        attributes.insert("fee".to_string(), UNKNOWN.to_string());
        FacilityRecord {
            id: FacilityId::Num(id),
            kind: FacilityKind::Point,
            latitude: lat,
            longitude: lon,
            name: format!("Lot <{id}>"),
            attributes,
            group_key: GroupKey::new(group, "FL"),
        }
    }

    #[test]
    fn test_popup_skips_unknown() {
        let html = popup_html(&record(1, 0.0, 0.0, "Tampa"), &["access", "capacity", "fee"]);
        assert_eq!(html, "<b>Lot &lt;1&gt;</b><br>City: Tampa, FL<br>Capacity: 250");
    }

    #[test]
    fn test_attribute_label() {
        assert_eq!(attribute_label("ev_connector_types"), "Connector Types");
        assert_eq!(attribute_label("ev_dc_fast_num"), "DC Fast Chargers");
        assert_eq!(attribute_label("ev_level2_evse_num"), "Level 2 Chargers");
        assert_eq!(attribute_label("fee"), "Fee");
        assert_eq!(attribute_label("max_stay"), "Max Stay");
    }

    #[test]
    fn test_center() {
        let set = ReducedMarkerSet::from(vec![
            record(1, 10.0, -80.0, "Tampa"),
            record(2, 20.0, -90.0, "Tampa"),
        ]);
        assert_eq!(map_center(&set), (15.0, -85.0));
        assert_eq!(map_center(&ReducedMarkerSet::default()), DEFAULT_CENTER);
    }

    #[test]
    fn test_render_map_layers_and_escaping() {
        let mut evil = record(3, 28.0, -82.4, "Tampa");
        evil.name = "</script><script>alert(1)</script>".to_string();
        let set = ReducedMarkerSet::from(vec![
            record(1, 27.9, -82.5, "Tampa"),
            evil,
            record(2, 33.7, -84.4, "Atlanta"),
        ]);

        let html = render_map(&set, &["capacity"], "Parking & Charging").unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Parking &amp; Charging</title>"));
        assert!(html.contains(r#"var groups = ["Tampa, FL","Atlanta, FL"];"#));
        assert!(!html.contains("</script><script>alert"));
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(!html.contains("__MARKERS__"));
    }

    #[test]
    fn test_render_empty_map() {
        let html = render_map(&ReducedMarkerSet::default(), &[], "Empty").unwrap();
        assert!(html.contains("setView([39.8283, -98.5795], 10)"));
        assert!(html.contains("var markers = [];"));
    }
}
