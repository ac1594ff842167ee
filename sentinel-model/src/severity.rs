//! Coarse severity labels. Sources with native levels (GDACS alert colours)
//! pass theirs through unchanged, so severity stays a plain string.

pub const SEVERITY_HIGH: &str = "High";
pub const SEVERITY_MEDIUM: &str = "Medium";
pub const SEVERITY_LOW: &str = "Low";
pub const SEVERITY_UNKNOWN: &str = "Unknown";

/// `High` at or above `threshold`, otherwise `Medium`. A missing magnitude
/// is `Medium`.
pub fn severity_by_magnitude(magnitude: Option<f64>, threshold: f64) -> &'static str {
    match magnitude {
        Some(mag) if mag >= threshold => SEVERITY_HIGH,
        _ => SEVERITY_MEDIUM,
    }
}
