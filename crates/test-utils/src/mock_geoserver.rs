//! A recording stand-in for the GeoServer REST API.
//!
//! Runs an axum server on an ephemeral local port. Every request is
//! recorded; responses come from registered rules or from defaults that
//! mimic a fresh, permissive GeoServer (POST 201, PUT 200, GET 200 with a
//! minimal layer or coverage definition).

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use axum::http::Method;

const REST_PREFIX: &str = "/geoserver/rest/";

/// A request as received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path relative to the REST root, e.g. `workspaces/ws/styles`
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone)]
struct Rule {
    method: Method,
    path: String,
    status: u16,
    body: String,
    remaining: Option<usize>,
}

#[derive(Debug)]
struct MockState {
    base_url: String,
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Mock GeoServer bound to `127.0.0.1` on a free port.
pub struct MockGeoServer {
    state: Arc<MockState>,
    port: u16,
    handle: JoinHandle<()>,
}

impl MockGeoServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock geoserver");
        let port = listener.local_addr().expect("local addr").port();

        let state = Arc::new(MockState {
            base_url: format!("http://127.0.0.1:{}", port),
            rules: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(record_and_respond).with_state(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            state,
            port,
            handle,
        }
    }

    /// Host part of the connection settings (scheme included).
    pub fn host(&self) -> String {
        "http://127.0.0.1".to_string()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Answer every `method path` request with `status` and `body`.
    ///
    /// `path` is relative to the REST root, without query string.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push_rule(method, path, status, body, None);
    }

    /// Answer only the next `method path` request with `status` and `body`.
    pub fn respond_once(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push_rule(method, path, status, body, Some(1));
    }

    fn push_rule(&self, method: Method, path: &str, status: u16, body: &str, remaining: Option<usize>) {
        // Newest rule wins.
        self.state.rules.lock().unwrap().insert(
            0,
            Rule {
                method,
                path: path.trim_start_matches('/').to_string(),
                status,
                body: body.to_string(),
                remaining,
            },
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Recorded requests with the given method and path.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    /// `METHOD path` lines in arrival order, handy for sequence assertions.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

impl Drop for MockGeoServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record_and_respond(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let path = uri
        .path()
        .strip_prefix(REST_PREFIX)
        .unwrap_or(uri.path())
        .to_string();

    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        content_type: header_value(header::CONTENT_TYPE),
        authorization: header_value(header::AUTHORIZATION),
        body: body.to_vec(),
    });

    if let Some((status, body)) = take_rule(&state, &method, &path) {
        return (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        );
    }

    default_response(&state.base_url, &method, &path)
}

fn take_rule(state: &MockState, method: &Method, path: &str) -> Option<(u16, String)> {
    let mut rules = state.rules.lock().unwrap();
    let idx = rules
        .iter()
        .position(|r| &r.method == method && r.path == path)?;

    let rule = rules[idx].clone();
    if let Some(remaining) = rule.remaining {
        if remaining <= 1 {
            rules.remove(idx);
        } else {
            rules[idx].remaining = Some(remaining - 1);
        }
    }
    Some((rule.status, rule.body))
}

fn default_response(base_url: &str, method: &Method, path: &str) -> (StatusCode, String) {
    if *method == Method::POST || (*method == Method::PUT && is_store_upload(path)) {
        (StatusCode::CREATED, String::new())
    } else if *method == Method::GET {
        (StatusCode::OK, default_get_body(base_url, path))
    } else {
        (StatusCode::OK, String::new())
    }
}

/// `workspaces/<ws>/coveragestores/<store>/file.<format>` creates a store.
fn is_store_upload(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    matches!(
        segments.as_slice(),
        ["workspaces", _, "coveragestores", _, file] if file.starts_with("file.")
    )
}

fn default_get_body(base_url: &str, path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["workspaces", ws, "layers", layer] => serde_json::json!({
            "layer": {
                "name": layer,
                "type": "RASTER",
                "defaultStyle": { "name": "raster" },
                "resource": {
                    "@class": "coverage",
                    "name": format!("{}:{}", ws, layer),
                    "href": format!(
                        "{}{}workspaces/{}/coveragestores/{}/coverages/{}.json",
                        base_url, REST_PREFIX, ws, layer, layer
                    )
                }
            }
        })
        .to_string(),
        ["workspaces", _, "coveragestores", _, "coverages", coverage] => {
            let name = coverage.trim_end_matches(".json");
            serde_json::json!({
                "coverage": { "name": name, "nativeCoverageName": name }
            })
            .to_string()
        }
        _ => "{}".to_string(),
    }
}
