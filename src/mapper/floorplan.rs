use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{map_all, Numeric, Scalar};
use crate::api::RawRecord;
use crate::error::Result;

const IMAGE_HOST: &str = "https://capi.myleasestar.com/v2/dimg";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorplanRecord {
    pub id: i64,
    pub name: String,
    pub beds: Number,
    pub baths: Number,
    pub floorplan_img: String,
}

impl FloorplanRecord {
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloorplanView {
    id: Numeric,
    name: String,
    bed_rooms: Number,
    bath_rooms: Number,
    floor_plan_images: Vec<ImageView>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageView {
    media_id: Scalar,
    max_width: Number,
    max_height: Number,
}

pub fn map_floorplans(raw: &[RawRecord]) -> Result<Vec<FloorplanRecord>> {
    map_all("floorplan", raw, |v: FloorplanView| {
        let image = v
            .floor_plan_images
            .first()
            .ok_or_else(|| "floorPlanImages is empty".to_string())?;
        Ok(FloorplanRecord {
            id: v.id.to_i64("id")?,
            floorplan_img: image_url(image),
            name: v.name,
            beds: v.bed_rooms,
            baths: v.bath_rooms,
        })
    })
}

fn image_url(image: &ImageView) -> String {
    format!(
        "{}/{}/{}x{}/{}.jpg",
        IMAGE_HOST, image.media_id, image.max_width, image.max_height, image.media_id
    )
}
