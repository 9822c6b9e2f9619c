//! Local HTTP server that records every request it receives.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn uri(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }
}

#[derive(Debug)]
pub struct MockRoute {
    method: Method,
    path: String,
    status: StatusCode,
    content_type: &'static str,
    body: String,
    /// Answer `202 Accepted` this many times before serving the body.
    pending_hits: usize,
    hits: AtomicUsize,
}

impl MockRoute {
    pub fn json(method: Method, path: &str, body: serde_json::Value) -> Self {
        Self {
            method,
            path: path.to_string(),
            status: StatusCode::OK,
            content_type: "application/json",
            body: body.to_string(),
            pending_hits: 0,
            hits: AtomicUsize::new(0),
        }
    }

    pub fn text(method: Method, path: &str, body: &str) -> Self {
        Self {
            content_type: "text/plain",
            body: body.to_string(),
            ..Self::json(method, path, serde_json::Value::Null)
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn pending_for(mut self, hits: usize) -> Self {
        self.pending_hits = hits;
        self
    }
}

struct ServerState {
    routes: Vec<MockRoute>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MockServer {
    pub base_url: String,
    state: Arc<ServerState>,
}

impl MockServer {
    pub async fn start(routes: Vec<MockRoute>) -> Self {
        let state = Arc::new(ServerState {
            routes,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(record).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

async fn record(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let recorded = RecordedRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    state.requests.lock().unwrap().push(recorded);

    let route = state
        .routes
        .iter()
        .find(|route| route.method == parts.method && route.path == parts.uri.path());
    let Some(route) = route else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"detail":"Not Found"}"#,
        )
            .into_response();
    };

    if route.hits.fetch_add(1, Ordering::SeqCst) < route.pending_hits {
        return StatusCode::ACCEPTED.into_response();
    }

    Response::builder()
        .status(route.status)
        .header(header::CONTENT_TYPE, route.content_type)
        .body(Body::from(route.body.clone()))
        .unwrap()
}
