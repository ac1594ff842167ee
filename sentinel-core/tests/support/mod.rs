#![allow(dead_code)]

use sentinel_core::{Coordinates, HazardEvent, HazardId};
use serde_json::json;

pub fn hazard(id: &str, severity: &str, lat: f64) -> HazardEvent {
    HazardEvent::new(
        HazardId::new(id).expect("fixture id"),
        "Earthquake",
        format!("fixture {id}"),
        Coordinates::new(lat, 10.0).expect("fixture coordinates"),
        severity,
        "USGS",
        "2024-05-01T10:00:00.000Z",
    )
}

pub fn usgs_body() -> String {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "id": "123",
                "properties": { "mag": 6.5, "place": "Off the coast", "time": 1_714_557_600_000_i64 },
                "geometry": { "type": "Point", "coordinates": [10.0, 45.0, 10.0] }
            },
            {
                "id": "124",
                "properties": { "mag": 4.4, "place": "Inland", "time": 1_714_557_600_000_i64 },
                "geometry": { "type": "Point", "coordinates": [20.0, 35.0, 5.0] }
            }
        ]
    })
    .to_string()
}

pub fn gdacs_body() -> String {
    json!({
        "features": [{
            "geometry": { "type": "Point", "coordinates": [121.5, 14.6] },
            "properties": {
                "eventid": 1000321,
                "eventtype": "TC",
                "name": "Tropical Cyclone EWINIAR-24",
                "alertlevel": "Orange",
                "todate": "2024-05-01T10:00:00"
            }
        }]
    })
    .to_string()
}

pub fn eonet_body() -> String {
    json!({
        "events": [{
            "id": "EONET_6543",
            "title": "Wildfire near Kelowna",
            "categories": [{ "title": "Wildfires" }],
            "geometry": [{ "date": "2024-05-01T00:00:00Z", "type": "Point", "coordinates": [-119.4, 49.8] }]
        }]
    })
    .to_string()
}

pub fn copernicus_body() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:georss="http://www.georss.org/georss">
  <channel>
    <item>
      <title>Flood Alert</title>
      <georss:point>42.0 13.0</georss:point>
      <pubDate>Wed, 01 May 2024 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#
        .to_string()
}

pub fn reliefweb_body() -> String {
    json!({ "totalCount": 31, "data": [] }).to_string()
}

pub fn emsc_body() -> String {
    json!({
        "features": [{
            "id": "20240501_0000123",
            "geometry": { "type": "Point", "coordinates": [23.1, 38.2, -10.0] },
            "properties": { "mag": 5.2, "flynn_region": "GREECE", "time": "2024-05-01T10:00:00Z" }
        }]
    })
    .to_string()
}
