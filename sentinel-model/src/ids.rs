use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Longest title fragment kept when an id has to be synthesized from text.
pub const SLUG_MAX_LEN: usize = 20;

/// Storage key of a hazard event.
///
/// Sources that publish a stable identifier use it verbatim (optionally with a
/// provider prefix). Sources without one get a slug derived from the title,
/// see [`HazardId::from_title`].
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct HazardId(String);

impl HazardId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ModelError::EmptyId);
        }
        Ok(Self(raw))
    }

    /// `<prefix>_<slug>` where the slug keeps only ASCII alphanumerics of the
    /// title, lowercased and cut at [`SLUG_MAX_LEN`] characters.
    ///
    /// Distinct titles sharing their first twenty alphanumerics collide.
    pub fn from_title(prefix: &str, title: &str) -> Self {
        let slug: String = title
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .take(SLUG_MAX_LEN)
            .collect();
        Self(format!("{prefix}_{slug}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for HazardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HazardId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for HazardId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_lowercase_alphanumeric_and_truncated() {
        let id = HazardId::from_title("copernicus", "Flood Alert");
        assert_eq!(id.as_str(), "copernicus_floodalert");

        let long = HazardId::from_title(
            "copernicus",
            "[EMSR712] Wildfire in Évora, Portugal - 2024",
        );
        assert_eq!(long.as_str(), "copernicus_emsr712wildfireinvor");
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert_eq!(HazardId::new("   "), Err(ModelError::EmptyId));
        assert_eq!(HazardId::new("us7000abcd").unwrap().as_str(), "us7000abcd");
    }
}
