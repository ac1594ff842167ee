use chrono::{DateTime, Utc};
use sentinel_model::{Coordinates, HazardEvent, HazardId, SEVERITY_UNKNOWN};
use serde_json::Value;
use tracing::debug;

use super::fields::{pick_number, pick_text, timestamp_or_ingested};
use super::{NormalizeError, NormalizedBatch};
use crate::feeds::FeedSource;

const DEFAULT_TITLE: &str = "Disaster";
const UNKNOWN_TYPE: &str = "Unknown";

/// GDACS two-letter event codes. Unknown codes pass through unchanged.
pub fn hazard_type_for(code: &str) -> &str {
    match code {
        "VO" => "Volcano",
        "TC" => "Tropical Cyclone",
        "FL" => "Flood",
        "EQ" => "Earthquake",
        "DR" => "Drought",
        "WF" => "Wildfire",
        "TS" => "Tsunami",
        other => other,
    }
}

pub fn parse(body: &str, ingested_at: DateTime<Utc>) -> Result<NormalizedBatch, NormalizeError> {
    let mut payload: Value = serde_json::from_str(body)?;
    // The endpoint sometimes serves a JSON string whose content is the document.
    if let Value::String(inner) = &payload {
        payload = serde_json::from_str(inner)?;
    }

    let records = match payload
        .get("features")
        .filter(|v| !v.is_null())
        .or_else(|| payload.get("results"))
    {
        Some(Value::Array(records)) => records,
        Some(_) => {
            return Err(NormalizeError::Shape(
                "GDACS record list is not an array".to_string(),
            ));
        }
        None => return Ok(NormalizedBatch::default()),
    };

    let mut batch = NormalizedBatch::default();
    for record in records {
        batch.accept(map_record(record, ingested_at));
    }
    Ok(batch)
}

fn map_record(record: &Value, ingested_at: DateTime<Utc>) -> Option<HazardEvent> {
    let props = record.get("properties");
    let prop = |key: &str| props.and_then(|p| p.get(key));
    let coords = record.pointer("/geometry/coordinates");

    let lat = pick_number(&[record.get("latitude"), coords.and_then(|c| c.get(1))]);
    let lng = pick_number(&[record.get("longitude"), coords.and_then(|c| c.get(0))]);
    let Some(position) = lat.zip(lng).and_then(|(lat, lng)| Coordinates::new(lat, lng)) else {
        debug!(source = "gdacs", "dropping record without coordinates");
        return None;
    };

    let title = pick_text(&[record.get("name"), prop("name")])
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let id = pick_text(&[record.get("eventid"), prop("eventid")])
        .and_then(|raw| HazardId::new(raw).ok())
        .unwrap_or_else(|| HazardId::from_title("gdacs", &title));
    let code = pick_text(&[record.get("eventtype"), prop("eventtype")]);
    let hazard_type = code
        .as_deref()
        .map(hazard_type_for)
        .unwrap_or(UNKNOWN_TYPE);
    let severity = pick_text(&[record.get("alertlevel"), prop("alertlevel")])
        .unwrap_or_else(|| SEVERITY_UNKNOWN.to_string());
    let todate = pick_text(&[record.get("todate"), prop("todate")]);

    Some(HazardEvent::new(
        id,
        hazard_type,
        title,
        position,
        severity,
        FeedSource::Gdacs.provider_name(),
        timestamp_or_ingested(todate.as_deref(), ingested_at),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn reads_geojson_features() {
        let body = json!({
            "type": "FeatureCollection",
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
        .to_string();

        let batch = parse(&body, now()).unwrap();
        assert_eq!(batch.dropped, 0);
        let event = &batch.events[0];
        assert_eq!(event.id.as_str(), "1000321");
        assert_eq!(event.hazard_type, "Tropical Cyclone");
        assert_eq!(event.title, "Tropical Cyclone EWINIAR-24");
        assert_eq!(event.lat, 14.6);
        assert_eq!(event.lng, 121.5);
        assert_eq!(event.severity, "Orange");
        assert_eq!(event.source, "GDACS");
        assert_eq!(event.timestamp, "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn event_codes_map_to_hazard_types() {
        let cases = [
            ("VO", "Volcano"),
            ("TC", "Tropical Cyclone"),
            ("FL", "Flood"),
            ("EQ", "Earthquake"),
            ("DR", "Drought"),
            ("WF", "Wildfire"),
            ("TS", "Tsunami"),
            ("XX", "XX"),
            ("eq", "eq"),
        ];
        for (code, expected) in cases {
            assert_eq!(hazard_type_for(code), expected, "code {code}");
        }
    }

    #[test]
    fn unwraps_double_encoded_results() {
        let inner = json!({
            "results": [{
                "eventid": "77",
                "eventtype": "XX",
                "latitude": "0",
                "longitude": "-12.5"
            }]
        })
        .to_string();
        let body = serde_json::to_string(&inner).unwrap();

        let batch = parse(&body, now()).unwrap();
        let event = &batch.events[0];
        assert_eq!(event.id.as_str(), "77");
        assert_eq!(event.hazard_type, "XX");
        assert_eq!(event.title, "Disaster");
        assert_eq!(event.lat, 0.0);
        assert_eq!(event.lng, -12.5);
        assert_eq!(event.severity, "Unknown");
        assert_eq!(event.timestamp, "2024-05-02T00:00:00.000Z");
    }

    #[test]
    fn top_level_fields_win_over_properties() {
        let body = json!({
            "features": [{
                "eventid": 5,
                "alertlevel": "Red",
                "latitude": 1.0,
                "longitude": 2.0,
                "geometry": { "coordinates": [50.0, 60.0] },
                "properties": { "eventid": 6, "alertlevel": "Green" }
            }]
        })
        .to_string();

        let event = &parse(&body, now()).unwrap().events[0];
        assert_eq!(event.id.as_str(), "5");
        assert_eq!(event.severity, "Red");
        assert_eq!((event.lat, event.lng), (1.0, 2.0));
    }

    #[test]
    fn records_without_eventid_get_a_stable_slug() {
        let body = json!({
            "features": [{
                "geometry": { "coordinates": [10.0, 20.0] },
                "properties": { "name": "Drought in Somalia" }
            }]
        })
        .to_string();

        let first = parse(&body, now()).unwrap();
        let second = parse(&body, now()).unwrap();
        assert_eq!(first.events[0].id.as_str(), "gdacs_droughtinsomalia");
        assert_eq!(first.events[0].id, second.events[0].id);
    }

    #[test]
    fn drops_records_without_a_position() {
        let body = json!({
            "features": [
                { "properties": { "eventid": 1 } },
                { "geometry": { "coordinates": [10.0, 20.0] }, "properties": { "eventid": 2 } }
            ]
        })
        .to_string();

        let batch = parse(&body, now()).unwrap();
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.dropped, 1);
    }

    #[test]
    fn unrecognised_envelope_is_empty() {
        let batch = parse(r#"{"status":"ok"}"#, now()).unwrap();
        assert!(batch.events.is_empty());
        assert!(parse(r#"{"features":{}}"#, now()).is_err());
    }
}
