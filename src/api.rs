use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{Result, ScrapeError};

pub const AUTH_HEADER: &str = "x-ws-authkey";

const UNIT_QUERY: &str = "available=false&honordisplayorder=true&siteid=8448226&bestprice=true\
&leaseterm=1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18";

/// Untyped record as the upstream API returns it.
pub type RawRecord = Value;

#[derive(Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Deserialize)]
struct FloorplanList {
    floorplans: Vec<RawRecord>,
}

#[derive(Deserialize)]
struct UnitList {
    units: Vec<RawRecord>,
}

/// Thin client for the leasing API. Every call carries the access token in
/// the `x-ws-authkey` header.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base: &str) -> Self {
        ApiClient {
            http,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_floorplans(&self, token: &str) -> Result<Vec<RawRecord>> {
        let url = format!("{}/floorplans", self.base);
        let list: FloorplanList = self.get(&url, token).await?;
        info!("Fetched {} floorplans", list.floorplans.len());
        Ok(list.floorplans)
    }

    pub async fn fetch_units(&self, token: &str) -> Result<Vec<RawRecord>> {
        let url = format!("{}/units?{}", self.base, UNIT_QUERY);
        let list: UnitList = self.get(&url, token).await?;
        info!("Fetched {} units", list.units.len());
        Ok(list.units)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .header(AUTH_HEADER, token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Http(format!("GET {} returned {}", url, status)));
        }

        let body: Value = response.json().await?;
        let envelope: Envelope<T> = serde_json::from_value(body)
            .map_err(|e| ScrapeError::Transform(format!("unexpected payload from {}: {}", url, e)))?;
        Ok(envelope.response)
    }
}
