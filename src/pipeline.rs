use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::api::ApiClient;
use crate::config::Upstream;
use crate::db::{self, DocumentStore};
use crate::error::{Result, ScrapeError};
use crate::keys;
use crate::mapper::{self, FloorplanRecord, RentRecord, UnitRecord};

/// Per-collection record counts for one successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub rents: usize,
    pub units: usize,
    pub floorplans: usize,
    pub elapsed: Duration,
}

/// Everything a run needs, built once at startup and shared by both
/// triggers.
pub struct Scraper {
    http: reqwest::Client,
    home_page: String,
    api: ApiClient,
    store: DocumentStore,
}

impl Scraper {
    pub fn new(upstream: &Upstream, store: DocumentStore) -> Self {
        let http = reqwest::Client::new();
        Scraper {
            api: ApiClient::new(http.clone(), &upstream.api_base),
            http,
            home_page: upstream.home_page.clone(),
            store,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Fetch a fresh token, then run the rent, unit and floorplan branches
    /// concurrently. Any failing branch fails the run; the other branches
    /// still run to completion and keep what they wrote.
    pub async fn run(&self) -> Result<RunSummary> {
        let t0 = Instant::now();
        info!("Scrape run starting");

        let token = keys::fetch_api_key(&self.http, &self.home_page).await?;

        let (rents, units, floorplans) = tokio::join!(
            self.write_rents(&token),
            self.write_units(&token),
            self.write_floorplans(&token),
        );

        let mut failure: Option<ScrapeError> = None;
        let mut settle = |collection: &str, outcome: Result<usize>| match outcome {
            Ok(n) => {
                info!("Merged {} documents into {}", n, collection);
                n
            }
            Err(e) => {
                error!("Branch {} failed: {}", collection, e);
                failure.get_or_insert(e);
                0
            }
        };
        let summary = RunSummary {
            rents: settle(db::RENTS, rents),
            units: settle(db::UNITS, units),
            floorplans: settle(db::FLOORPLANS, floorplans),
            elapsed: t0.elapsed(),
        };

        if let Some(e) = failure {
            return Err(e);
        }
        info!(
            "Scrape run done in {:.1}s: {} rents, {} units, {} floorplans",
            summary.elapsed.as_secs_f64(),
            summary.rents,
            summary.units,
            summary.floorplans
        );
        Ok(summary)
    }

    // Units are fetched separately by the rent and unit branches.
    async fn write_rents(&self, token: &str) -> Result<usize> {
        let raw = self.api.fetch_units(token).await?;
        let records = mapper::map_rents(&raw)?;
        self.store.write_batch(db::RENTS, &records, RentRecord::key).await
    }

    async fn write_units(&self, token: &str) -> Result<usize> {
        let raw = self.api.fetch_units(token).await?;
        let records = mapper::map_units(&raw)?;
        self.store.write_batch(db::UNITS, &records, UnitRecord::key).await
    }

    async fn write_floorplans(&self, token: &str) -> Result<usize> {
        let raw = self.api.fetch_floorplans(token).await?;
        let records = mapper::map_floorplans(&raw)?;
        self.store
            .write_batch(db::FLOORPLANS, &records, FloorplanRecord::key)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::{FakeUpstream, DEFAULT_KEY};
    use axum::http::StatusCode;
    use serde_json::json;

    pub(crate) fn scraper_for(upstream: &FakeUpstream) -> Scraper {
        let target = Upstream {
            home_page: upstream.home_page_url(),
            api_base: upstream.api_base_url(),
        };
        let store = DocumentStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        Scraper::new(&target, store)
    }

    #[tokio::test]
    async fn full_run_writes_all_collections() {
        let upstream = FakeUpstream::builder().start().await;
        let scraper = scraper_for(&upstream);

        let summary = scraper.run().await.unwrap();
        assert_eq!((summary.rents, summary.units, summary.floorplans), (2, 2, 1));

        let store = scraper.store();
        assert_eq!(
            store.get(db::RENTS, "101_1705314600000").unwrap(),
            Some(json!({"id": 101, "rent": 1500, "available": true, "rentModified": 1705314600000i64}))
        );
        assert_eq!(
            store.get(db::UNITS, "202").unwrap(),
            Some(json!({"id": 202, "floor": 2, "sqrt": 850, "floorplanId": 7}))
        );
        assert_eq!(
            store.get(db::FLOORPLANS, "3").unwrap().unwrap()["floorplanImg"],
            "https://capi.myleasestar.com/v2/dimg/m1/400x300/m1.jpg"
        );

        let seen = upstream.seen();
        assert_eq!(seen.iter().filter(|r| r.path == "/api/units").count(), 2);
        assert_eq!(seen.iter().filter(|r| r.path == "/api/floorplans").count(), 1);
        assert!(seen.iter().all(|r| r.auth_key.as_deref() == Some(DEFAULT_KEY)));
    }

    #[tokio::test]
    async fn repeated_runs_merge_instead_of_duplicating() {
        let upstream = FakeUpstream::builder().start().await;
        let scraper = scraper_for(&upstream);

        scraper.run().await.unwrap();
        scraper.run().await.unwrap();

        let store = scraper.store();
        assert_eq!(store.count(db::RENTS).unwrap(), 2);
        assert_eq!(store.count(db::UNITS).unwrap(), 2);
        assert_eq!(store.count(db::FLOORPLANS).unwrap(), 1);
    }

    #[tokio::test]
    async fn floorplan_failure_fails_the_run() {
        let upstream = FakeUpstream::builder()
            .floorplans(StatusCode::INTERNAL_SERVER_ERROR, "{}")
            .start()
            .await;
        let scraper = scraper_for(&upstream);

        let err = scraper.run().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Http(_)));

        // The unit-derived branches completed on their own.
        assert_eq!(scraper.store().count(db::RENTS).unwrap(), 2);
        assert_eq!(scraper.store().count(db::UNITS).unwrap(), 2);
        assert_eq!(scraper.store().count(db::FLOORPLANS).unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_key_stops_before_api_calls() {
        let upstream = FakeUpstream::builder()
            .home_page("<html>redesigned</html>")
            .start()
            .await;
        let scraper = scraper_for(&upstream);

        let err = scraper.run().await.unwrap_err();
        assert!(matches!(err, ScrapeError::KeyNotFound(_)));
        assert!(upstream.seen().is_empty());
    }

    #[tokio::test]
    async fn bad_unit_payload_fails_the_run() {
        let upstream = FakeUpstream::builder()
            .units(
                StatusCode::OK,
                r#"{"response":{"units":[{"name":"x","floorNumber":1}]}}"#,
            )
            .start()
            .await;
        let scraper = scraper_for(&upstream);

        let err = scraper.run().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Transform(_)));
        assert_eq!(scraper.store().count(db::FLOORPLANS).unwrap(), 1);
    }
}
