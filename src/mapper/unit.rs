use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{map_all, Numeric};
use crate::api::RawRecord;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    pub id: i64,
    pub floor: Number,
    /// Square footage.
    pub sqrt: Number,
    pub floorplan_id: i64,
}

impl UnitRecord {
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitView {
    name: Numeric,
    floor_number: Number,
    square_feet: Number,
    floorplan_id: Numeric,
}

pub fn map_units(raw: &[RawRecord]) -> Result<Vec<UnitRecord>> {
    map_all("unit", raw, |v: UnitView| {
        Ok(UnitRecord {
            id: v.name.to_i64("name")?,
            floor: v.floor_number,
            sqrt: v.square_feet,
            floorplan_id: v.floorplan_id.to_i64("floorplanId")?,
        })
    })
}
