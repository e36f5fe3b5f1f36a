//! Two ways to start a run: a daily timer and an HTTP endpoint. Both call
//! [`Scraper::run`] and nothing else.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{any, get};
use axum::{Json, Router};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::pipeline::Scraper;

// ── Scheduled ──

/// The first `at` (UTC) strictly after `now`.
pub fn next_fire(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Run once a day at `at` forever. Failures are logged; the next day's run
/// goes ahead regardless.
pub async fn run_daily(scraper: Arc<Scraper>, at: NaiveTime) {
    loop {
        let now = Utc::now();
        let next = next_fire(now, at);
        info!("Next scheduled run at {}", next);
        tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

        if let Err(e) = scraper.run().await {
            error!("Scheduled run failed: {}", e);
        }
    }
}

// ── On-demand ──

pub fn router(scraper: Arc<Scraper>) -> Router {
    Router::new()
        .route("/scrape", any(scrape))
        .route("/health", get(health))
        .with_state(scraper)
}

async fn scrape(State(scraper): State<Arc<Scraper>>) -> (StatusCode, Json<Value>) {
    match scraper.run().await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "success" }))),
        Err(e) => {
            error!("On-demand run failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "error": e.to_string() })),
            )
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

pub async fn serve(scraper: Arc<Scraper>, listen: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(scraper)).await?;
    Ok(())
}
