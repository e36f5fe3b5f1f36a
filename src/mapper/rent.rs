use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{map_all, Numeric};
use crate::api::RawRecord;
use crate::error::Result;

/// Upstream timestamp layout, e.g. `2024-01-15 10:30 +0000`.
const RENT_MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M %z";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentRecord {
    pub id: i64,
    pub rent: Number,
    pub available: bool,
    /// Epoch milliseconds.
    pub rent_modified: i64,
}

impl RentRecord {
    /// One document per unit per price change.
    pub fn key(&self) -> String {
        format!("{}_{}", self.id, self.rent_modified)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentView {
    name: Numeric,
    rent: Number,
    lease_status: String,
    rent_modified_timestamp: String,
}

pub fn map_rents(raw: &[RawRecord]) -> Result<Vec<RentRecord>> {
    map_all("rent", raw, |v: RentView| {
        Ok(RentRecord {
            id: v.name.to_i64("name")?,
            rent: v.rent,
            available: v.lease_status != "LEASED",
            rent_modified: parse_millis(&v.rent_modified_timestamp)?,
        })
    })
}

fn parse_millis(ts: &str) -> std::result::Result<i64, String> {
    DateTime::parse_from_str(ts, RENT_MODIFIED_FORMAT)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| format!("bad rentModifiedTimestamp {:?}: {}", ts, e))
}
