//! ReliefWeb is polled for monitoring only. Its disasters carry no usable
//! coordinates, so the payload is reduced to the item count it reports.

use serde::Deserialize;
use tracing::info;

use super::{NormalizeError, NormalizedBatch};

#[derive(Debug, Deserialize)]
struct DisasterList {
    #[serde(rename = "totalCount", default)]
    total_count: Option<u64>,
}

pub fn parse(body: &str) -> Result<NormalizedBatch, NormalizeError> {
    let list: DisasterList = serde_json::from_str(body)?;
    let total = list.total_count.unwrap_or(0);
    info!(source = "reliefweb", total, "ReliefWeb disasters listed");

    Ok(NormalizedBatch {
        reported_total: Some(total),
        ..NormalizedBatch::default()
    })
}
