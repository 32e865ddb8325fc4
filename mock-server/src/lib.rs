//! A small implementation of the Safe Browsing Lookup API.
//!
//! Serves `POST /safebrowsing/api/lookup` against in-memory malware and
//! phishing lists, with admin routes to replace the lists, simulate overload
//! and count lookups. Used by the client's integration tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const LOOKUP_PATH: &str = "/safebrowsing/api/lookup";

/// Largest batch the service accepts.
pub const MAX_URLS: usize = 500;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lists {
    #[serde(default)]
    pub malware: HashSet<String>,
    #[serde(default)]
    pub phishing: HashSet<String>,
}

impl Lists {
    /// Wire token for one URL. URLs on both lists are reported phishing
    /// first, the way the live service does.
    pub fn verdict(&self, url: &str) -> &'static str {
        match (self.malware.contains(url), self.phishing.contains(url)) {
            (true, true) => "phishing,malware",
            (true, false) => "malware",
            (false, true) => "phishing",
            (false, false) => "ok",
        }
    }
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub api_key: String,
    /// Answer bad keys with 403 instead of 401.
    pub forbid_instead_of_unauthorized: bool,
}

impl MockConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            forbid_instead_of_unauthorized: false,
        }
    }
}

#[derive(Debug)]
pub struct MockState {
    config: MockConfig,
    lists: RwLock<Lists>,
    overloaded: AtomicBool,
    lookups: AtomicU64,
}

pub type SharedState = Arc<MockState>;

impl MockState {
    pub fn new(config: MockConfig) -> SharedState {
        Arc::new(Self {
            config,
            lists: RwLock::new(Lists::default()),
            overloaded: AtomicBool::new(false),
            lookups: AtomicU64::new(0),
        })
    }

    pub async fn set_lists(&self, lists: Lists) {
        *self.lists.write().await = lists;
    }

    pub fn set_overloaded(&self, overloaded: bool) {
        self.overloaded.store(overloaded, Ordering::SeqCst);
    }

    /// Number of lookup requests that reached list matching.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub client: Option<String>,
    pub apikey: Option<String>,
    pub appver: Option<String>,
    pub pver: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Stats {
    pub lookups: u64,
}

pub fn app(config: MockConfig) -> Router {
    router(MockState::new(config))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(LOOKUP_PATH, post(lookup))
        .route("/admin/lists", put(replace_lists))
        .route("/admin/overloaded", put(set_overloaded))
        .route("/admin/stats", get(stats))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: SharedState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

async fn lookup(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
    body: String,
) -> Response {
    let apikey = match (&params.client, &params.apikey, &params.appver, &params.pver) {
        (Some(_), Some(key), Some(_), Some(_)) => key,
        _ => {
            debug!("rejecting lookup with incomplete query: {params:?}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if *apikey != state.config.api_key {
        debug!("rejecting lookup with unknown key");
        return if state.config.forbid_instead_of_unauthorized {
            StatusCode::FORBIDDEN.into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        };
    }

    if state.overloaded.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let urls = match parse_body(&body) {
        Some(urls) => urls,
        None => {
            debug!("rejecting malformed lookup body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    state.lookups.fetch_add(1, Ordering::SeqCst);
    let lists = state.lists.read().await;
    let verdicts: Vec<&str> = urls.iter().map(|url| lists.verdict(url)).collect();
    info!("lookup of {} URLs", urls.len());

    if verdicts.iter().all(|v| *v == "ok") {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::OK, verdicts.join("\n")).into_response()
    }
}

/// A count line followed by exactly that many URL lines.
fn parse_body(body: &str) -> Option<Vec<&str>> {
    let mut lines = body.lines();
    let count: usize = lines.next()?.trim().parse().ok()?;
    let urls: Vec<&str> = lines.collect();
    (count == urls.len() && count <= MAX_URLS).then_some(urls)
}

async fn replace_lists(State(state): State<SharedState>, Json(lists): Json<Lists>) -> StatusCode {
    info!(
        "lists replaced: {} malware, {} phishing",
        lists.malware.len(),
        lists.phishing.len()
    );
    state.set_lists(lists).await;
    StatusCode::NO_CONTENT
}

async fn set_overloaded(State(state): State<SharedState>, Json(overloaded): Json<bool>) -> StatusCode {
    state.set_overloaded(overloaded);
    StatusCode::NO_CONTENT
}

async fn stats(State(state): State<SharedState>) -> Json<Stats> {
    Json(Stats {
        lookups: state.lookups(),
    })
}
