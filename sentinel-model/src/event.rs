use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::HazardId;

/// A validated WGS84 point. Both components are finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Coordinates {
    /// Returns `None` when either component is NaN or infinite.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        (lat.is_finite() && lng.is_finite()).then_some(Self { lat, lng })
    }

    /// Parses the GeoRSS `"lat lng"` form.
    pub fn parse_georss(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace();
        let lat = parts.next()?.parse::<f64>().ok()?;
        let lng = parts.next()?.parse::<f64>().ok()?;
        Self::new(lat, lng)
    }

    /// GeoJSON positions are `[lng, lat, ...]`.
    pub fn from_geojson_position(position: &[f64]) -> Option<Self> {
        match position {
            [lng, lat, ..] => Self::new(*lat, *lng),
            _ => None,
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

/// Canonical hazard record every feed is normalized into.
///
/// Field names on the wire are the ones downstream map clients read:
/// `id`, `type`, `title`, `lat`, `lng`, `severity`, `source`, `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardEvent {
    pub id: HazardId,
    #[serde(rename = "type")]
    pub hazard_type: String,
    pub title: String,
    pub lat: f64,
    pub lng: f64,
    pub severity: String,
    pub source: String,
    pub timestamp: String,
}

impl HazardEvent {
    pub fn new(
        id: HazardId,
        hazard_type: impl Into<String>,
        title: impl Into<String>,
        position: Coordinates,
        severity: impl Into<String>,
        source: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id,
            hazard_type: hazard_type.into(),
            title: title.into(),
            lat: position.lat(),
            lng: position.lng(),
            severity: severity.into(),
            source: source.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Records read back from storage are not guaranteed to be valid, so the
    /// reconciler re-checks this instead of trusting the type.
    pub fn has_valid_coordinates(&self) -> bool {
        Coordinates::new(self.lat, self.lng).is_some()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.lat, self.lng)
    }
}

/// ISO-8601 rendering used for every `timestamp` field.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
