use chrono::{DateTime, Utc};
use sentinel_model::{HazardEvent, HazardId, severity_by_magnitude};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::fields::{number, text, timestamp_or_ingested};
use super::usgs::Geometry;
use super::{NormalizeError, NormalizedBatch};
use crate::feeds::FeedSource;

/// EMSC reports more moderate European quakes, so its cut-off is lower.
pub const HIGH_MAGNITUDE: f64 = 5.0;

const DEFAULT_REGION: &str = "Europe";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Properties>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    mag: Option<Value>,
    flynn_region: Option<Value>,
    time: Option<Value>,
}

pub fn parse(body: &str, ingested_at: DateTime<Utc>) -> Result<NormalizedBatch, NormalizeError> {
    let collection: FeatureCollection = serde_json::from_str(body)?;

    let mut batch = NormalizedBatch::default();
    for raw in collection.features {
        let event = serde_json::from_value::<Feature>(raw)
            .ok()
            .and_then(|feature| map_feature(feature, ingested_at));
        batch.accept(event);
    }
    Ok(batch)
}

fn map_feature(feature: Feature, ingested_at: DateTime<Utc>) -> Option<HazardEvent> {
    let raw_id = feature.id.as_ref().and_then(text)?;
    let id = HazardId::new(format!("emsc_{raw_id}")).ok()?;
    let Some(position) = feature.geometry.as_ref().and_then(Geometry::position) else {
        debug!(source = "emsc", id = %id, "dropping quake without coordinates");
        return None;
    };
    let props = feature.properties.unwrap_or_default();
    let mag = props.mag.as_ref().and_then(number);
    let magnitude = mag
        .map(|mag| mag.to_string())
        .unwrap_or_else(|| "?".to_string());
    let region = props
        .flynn_region
        .as_ref()
        .and_then(|value| value.as_str())
        .filter(|region| !region.trim().is_empty())
        .unwrap_or(DEFAULT_REGION);
    let time = props.time.as_ref().and_then(|value| value.as_str());

    Some(HazardEvent::new(
        id,
        "Earthquake",
        format!("M{magnitude} - {region}"),
        position,
        severity_by_magnitude(mag, HIGH_MAGNITUDE),
        FeedSource::Emsc.provider_name(),
        timestamp_or_ingested(time, ingested_at),
    ))
}
