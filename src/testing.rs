//! Fake leasing site for tests: a home page plus the two API endpoints,
//! served by axum on an ephemeral local port.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::api::AUTH_HEADER;

pub const DEFAULT_KEY: &str = "test-key";

const FLOORPLANS_BODY: &str = r#"{"response":{"floorplans":[
    {"id":"3","name":"Studio A","bedRooms":0,"bathRooms":1,
     "floorPlanImages":[{"mediaId":"m1","maxWidth":400,"maxHeight":300}]}
]}}"#;

const UNITS_BODY: &str = r#"{"response":{"units":[
    {"name":"101","rent":1500,"leaseStatus":"AVAILABLE",
     "rentModifiedTimestamp":"2024-01-15 10:30 +0000",
     "floorNumber":1,"squareFeet":640,"floorplanId":"3"},
    {"name":"202","rent":2100,"leaseStatus":"LEASED",
     "rentModifiedTimestamp":"2024-02-01 08:00 -0500",
     "floorNumber":2,"squareFeet":850,"floorplanId":"7"}
]}}"#;

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    content_type: &'static str,
}

impl Canned {
    fn json(status: StatusCode, body: &str) -> Self {
        Canned {
            status,
            body: body.to_string(),
            content_type: "application/json",
        }
    }

    fn respond(&self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body.clone(),
        )
            .into_response()
    }
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub query: Option<String>,
    pub auth_key: Option<String>,
}

struct Shared {
    home: Canned,
    floorplans: Canned,
    units: Canned,
    seen: Mutex<Vec<SeenRequest>>,
}

impl Shared {
    fn record(&self, uri: &Uri, headers: &HeaderMap) {
        let auth_key = headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().unwrap().push(SeenRequest {
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            auth_key,
        });
    }
}

pub struct FakeUpstreamBuilder {
    home: Canned,
    floorplans: Canned,
    units: Canned,
}

impl FakeUpstreamBuilder {
    pub fn home_page(mut self, html: &str) -> Self {
        self.home = Canned {
            status: StatusCode::OK,
            body: html.to_string(),
            content_type: "text/html",
        };
        self
    }

    pub fn floorplans(mut self, status: StatusCode, body: &str) -> Self {
        self.floorplans = Canned::json(status, body);
        self
    }

    pub fn units(mut self, status: StatusCode, body: &str) -> Self {
        self.units = Canned::json(status, body);
        self
    }

    pub async fn start(self) -> FakeUpstream {
        let shared = Arc::new(Shared {
            home: self.home,
            floorplans: self.floorplans,
            units: self.units,
            seen: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/home", get(home))
            .route("/api/floorplans", get(floorplans))
            .route("/api/units", get(units))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        FakeUpstream { addr, shared }
    }
}

pub struct FakeUpstream {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeUpstream {
    pub fn builder() -> FakeUpstreamBuilder {
        FakeUpstreamBuilder {
            home: Canned {
                status: StatusCode::OK,
                body: format!("<script>init({{ apiKey: '{}' }});</script>", DEFAULT_KEY),
                content_type: "text/html",
            },
            floorplans: Canned::json(StatusCode::OK, FLOORPLANS_BODY),
            units: Canned::json(StatusCode::OK, UNITS_BODY),
        }
    }

    pub fn home_page_url(&self) -> String {
        format!("http://{}/home", self.addr)
    }

    pub fn api_base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// API requests received so far, in arrival order. Home page hits are
    /// not recorded.
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.shared.seen.lock().unwrap().clone()
    }
}

async fn home(State(s): State<Arc<Shared>>) -> Response {
    s.home.respond()
}

async fn floorplans(State(s): State<Arc<Shared>>, uri: Uri, headers: HeaderMap) -> Response {
    s.record(&uri, &headers);
    s.floorplans.respond()
}

async fn units(State(s): State<Arc<Shared>>, uri: Uri, headers: HeaderMap) -> Response {
    s.record(&uri, &headers);
    s.units.respond()
}
