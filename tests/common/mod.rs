//! In-process mock of the REST backend.
//!
//! Serves the same paths as the real service on `127.0.0.1:<random port>`,
//! keeps entities as JSON with integer ids, records every request, and can
//! be told to fail a specific `(method, path)` with a 500.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use nexus_console::{ApiClient, Console};

type Shared = Arc<Mutex<Db>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct Db {
    next_id: i64,
    collections: HashMap<String, Vec<Value>>,
    links: HashMap<String, BTreeSet<i64>>,
    workflows: HashMap<String, Value>,
    requests: Vec<Recorded>,
    failing: HashSet<(String, String)>,
}

impl Db {
    fn items(&mut self, collection: &str) -> &mut Vec<Value> {
        self.collections.entry(collection.to_string()).or_default()
    }

    fn find(&mut self, collection: &str, id: &str) -> Option<&mut Value> {
        self.items(collection).iter_mut().find(|v| v["id"].to_string() == id)
    }

    fn insert(&mut self, collection: &str, mut body: Value) -> Value {
        self.next_id += 1;
        body["id"] = json!(self.next_id);
        self.items(collection).push(body.clone());
        body
    }
}

pub struct MockBackend {
    addr: SocketAddr,
    db: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let db: Shared = Arc::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(db.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self { addr, db }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url(), None).unwrap()
    }

    pub fn console(&self) -> Console {
        Console::with_client(self.client())
    }

    // ── Seeding ───────────────────────────────────────────────────────────────

    /// Insert an entity and return its assigned integer id.
    pub fn seed(&self, collection: &str, body: Value) -> i64 {
        let created = self.db.lock().unwrap().insert(collection, body);
        created["id"].as_i64().unwrap()
    }

    pub fn link(&self, primary: &str, primary_id: i64, secondary: &str, secondary_id: i64) {
        self.db
            .lock()
            .unwrap()
            .links
            .entry(format!("{primary}/{primary_id}/{secondary}"))
            .or_default()
            .insert(secondary_id);
    }

    pub fn set_workflow(&self, agency_id: i64, workflow: Value) {
        self.db.lock().unwrap().workflows.insert(agency_id.to_string(), workflow);
    }

    /// Make `method path` answer 500 with `{"detail": "boom"}`.
    pub fn fail(&self, method: &str, path: &str) {
        self.db
            .lock()
            .unwrap()
            .failing
            .insert((method.to_string(), path.to_string()));
    }

    /// Undo a previous [`fail`](Self::fail).
    pub fn recover(&self, method: &str, path: &str) {
        self.db
            .lock()
            .unwrap()
            .failing
            .remove(&(method.to_string(), path.to_string()));
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn requests(&self) -> Vec<Recorded> {
        self.db.lock().unwrap().requests.clone()
    }

    /// Requests matching `method path`, in arrival order.
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.db.lock().unwrap().requests.clear();
    }

    pub fn stored(&self, collection: &str) -> Vec<Value> {
        self.db.lock().unwrap().items(collection).clone()
    }

    pub fn linked_ids(&self, primary: &str, primary_id: i64, secondary: &str) -> Vec<i64> {
        self.db
            .lock()
            .unwrap()
            .links
            .get(&format!("{primary}/{primary_id}/{secondary}"))
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

fn build_router(db: Shared) -> Router {
    let mut router = Router::new();
    for collection in ["agencies", "agents", "tools"] {
        router = crud(router, collection);
    }
    router = links(router, "agencies", "agents");
    router = links(router, "agents", "tools");
    router
        .route("/api/workflow/{id}", get(workflow))
        .route("/api/chat/a2a/", post(a2a))
        .route("/api/chat/mcp/", post(mcp))
        .layer(middleware::from_fn_with_state(db.clone(), record))
        .with_state(db)
}

fn crud(router: Router<Shared>, collection: &'static str) -> Router<Shared> {
    router
        .route(
            &format!("/api/{collection}"),
            get(move |State(db): State<Shared>| async move {
                Json(db.lock().unwrap().items(collection).clone())
            })
            .post(move |State(db): State<Shared>, Json(body): Json<Value>| async move {
                Json(db.lock().unwrap().insert(collection, body))
            }),
        )
        .route(
            &format!("/api/{collection}/{{id}}"),
            get(move |State(db): State<Shared>, Path(id): Path<String>| async move {
                match db.lock().unwrap().find(collection, &id) {
                    Some(v) => Json(v.clone()).into_response(),
                    None => not_found(collection),
                }
            })
            .put(
                move |State(db): State<Shared>, Path(id): Path<String>, Json(mut body): Json<Value>| async move {
                    let mut db = db.lock().unwrap();
                    match db.find(collection, &id) {
                        Some(existing) => {
                            body["id"] = existing["id"].clone();
                            *existing = body.clone();
                            Json(body).into_response()
                        }
                        None => not_found(collection),
                    }
                },
            )
            .delete(move |State(db): State<Shared>, Path(id): Path<String>| async move {
                let mut db = db.lock().unwrap();
                let items = db.items(collection);
                let before = items.len();
                items.retain(|v| v["id"].to_string() != id);
                if items.len() == before {
                    return not_found(collection);
                }
                Json(json!({ "ok": true })).into_response()
            }),
        )
}

fn links(router: Router<Shared>, primary: &'static str, secondary: &'static str) -> Router<Shared> {
    router
        .route(
            &format!("/api/{primary}/{{id}}/{secondary}"),
            get(move |State(db): State<Shared>, Path(id): Path<String>| async move {
                let mut db = db.lock().unwrap();
                let ids = db
                    .links
                    .get(&format!("{primary}/{id}/{secondary}"))
                    .cloned()
                    .unwrap_or_default();
                let linked: Vec<Value> = db
                    .items(secondary)
                    .iter()
                    .filter(|v| v["id"].as_i64().is_some_and(|i| ids.contains(&i)))
                    .cloned()
                    .collect();
                Json(linked)
            }),
        )
        .route(
            &format!("/api/{primary}/{{id}}/{secondary}/{{other}}"),
            post(move |State(db): State<Shared>, Path((id, other)): Path<(String, i64)>| async move {
                let mut db = db.lock().unwrap();
                if db.find(primary, &id).is_none() {
                    return not_found(primary);
                }
                db.links.entry(format!("{primary}/{id}/{secondary}")).or_default().insert(other);
                Json(json!({ "ok": true })).into_response()
            })
            .delete(move |State(db): State<Shared>, Path((id, other)): Path<(String, i64)>| async move {
                let mut db = db.lock().unwrap();
                if let Some(set) = db.links.get_mut(&format!("{primary}/{id}/{secondary}")) {
                    set.remove(&other);
                }
                StatusCode::NO_CONTENT.into_response()
            }),
        )
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn workflow(State(db): State<Shared>, Path(id): Path<String>) -> Response {
    match db.lock().unwrap().workflows.get(&id) {
        Some(w) => Json(w.clone()).into_response(),
        None => Json(json!({ "nodes": [], "edges": [] })).into_response(),
    }
}

async fn a2a(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "status": "delivered", "echo": body["payload"] }))
}

async fn mcp(Json(body): Json<Value>) -> Response {
    let tool = body["tool_name"].as_str().unwrap_or_default();
    if tool == "echo" {
        return Json(json!({ "result": body["args"] })).into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": format!("Tool '{tool}' not found") })),
    )
        .into_response()
}

fn not_found(collection: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": format!("{collection} item not found") })))
        .into_response()
}

/// Record the request, then either inject a failure or pass it through.
async fn record(State(db): State<Shared>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    {
        let mut db = db.lock().unwrap();
        db.requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            body: serde_json::from_slice(&bytes).ok(),
        });
        if db.failing.contains(&(method, path)) {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": "boom" })))
                .into_response();
        }
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
