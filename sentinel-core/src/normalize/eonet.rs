use chrono::{DateTime, Utc};
use sentinel_model::{Coordinates, HazardEvent, HazardId, SEVERITY_UNKNOWN};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::fields::{text, timestamp_or_ingested};
use super::{NormalizeError, NormalizedBatch};
use crate::feeds::FeedSource;

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: Option<Value>,
    title: Option<String>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    geometry: Vec<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Category {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    date: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    coordinates: Value,
}

impl Geometry {
    /// Only points carry a usable position; polygons are skipped.
    fn point(&self) -> Option<Coordinates> {
        if self.kind.as_deref().is_some_and(|kind| kind != "Point") {
            return None;
        }
        let position = self.coordinates.as_array()?;
        let lng = position.first()?.as_f64()?;
        let lat = position.get(1)?.as_f64()?;
        Coordinates::new(lat, lng)
    }
}

pub fn parse(body: &str, ingested_at: DateTime<Utc>) -> Result<NormalizedBatch, NormalizeError> {
    let list: EventList = serde_json::from_str(body)?;

    let mut batch = NormalizedBatch::default();
    for raw in list.events {
        let event = serde_json::from_value::<Event>(raw)
            .ok()
            .and_then(|event| map_event(event, ingested_at));
        batch.accept(event);
    }
    Ok(batch)
}

fn map_event(event: Event, ingested_at: DateTime<Utc>) -> Option<HazardEvent> {
    let id = event
        .id
        .as_ref()
        .and_then(text)
        .and_then(|raw| HazardId::new(raw).ok())?;
    // Geometry entries are chronological; the newest one is the current position.
    let latest = event.geometry.last();
    let Some(position) = latest.and_then(Geometry::point) else {
        debug!(source = "eonet", id = %id, "dropping event without a point geometry");
        return None;
    };
    let hazard_type = event
        .categories
        .into_iter()
        .next()
        .and_then(|category| category.title)
        .unwrap_or_else(|| "Unknown".to_string());

    Some(HazardEvent::new(
        id,
        hazard_type,
        event.title.unwrap_or_default(),
        position,
        SEVERITY_UNKNOWN,
        FeedSource::Eonet.provider_name(),
        timestamp_or_ingested(latest.and_then(|g| g.date.as_deref()), ingested_at),
    ))
}
