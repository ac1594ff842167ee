use chrono::{DateTime, Utc};
use sentinel_model::{Coordinates, HazardEvent, HazardId, severity_by_magnitude};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::fields::{epoch_millis_or_ingested, number, text};
use super::{NormalizeError, NormalizedBatch};
use crate::feeds::FeedSource;

/// Magnitude at or above which a USGS quake is `High`.
pub const HIGH_MAGNITUDE: f64 = 6.0;

const UNKNOWN_PLACE: &str = "Unknown location";

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

/// Values stay untyped; an oddly typed field falls back to its default.
#[derive(Debug, Default, Deserialize)]
struct Properties {
    mag: Option<Value>,
    place: Option<Value>,
    time: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    #[serde(default)]
    pub(crate) coordinates: Vec<Value>,
}

impl Geometry {
    /// `[lng, lat, depth]`; depth may be absent.
    pub(crate) fn position(&self) -> Option<Coordinates> {
        match self.coordinates.as_slice() {
            [lng, lat, ..] => Coordinates::new(number(lat)?, number(lng)?),
            _ => None,
        }
    }
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
    let id = feature
        .id
        .as_ref()
        .and_then(text)
        .and_then(|raw| HazardId::new(raw).ok())?;
    let Some(position) = feature.geometry.as_ref().and_then(Geometry::position) else {
        debug!(source = "usgs", id = %id, "dropping quake without coordinates");
        return None;
    };
    let props = feature.properties.unwrap_or_default();
    let place = props
        .place
        .as_ref()
        .and_then(|value| value.as_str())
        .filter(|place| !place.trim().is_empty())
        .unwrap_or(UNKNOWN_PLACE);

    Some(HazardEvent::new(
        id,
        "Earthquake",
        place,
        position,
        severity_by_magnitude(props.mag.as_ref().and_then(number), HIGH_MAGNITUDE),
        FeedSource::Usgs.provider_name(),
        epoch_millis_or_ingested(props.time.as_ref().and_then(number), ingested_at),
    ))
}
