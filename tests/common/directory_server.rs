//! Fake user directory
//!
//! Serves the subset of the directory REST API the identity fragment talks to,
//! keeping users in memory. Ids are sequential (`user-1`, `user-2`, ...) so tests
//! can predict them. Deleted users are kept aside until restored.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use song_director_store::fragment::DirectoryFragmentConfig;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const DIRECTORY_DOMAIN: &str = "choir.example.com";

/// Routes of the fake directory that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryRoute {
    Create,
    Get,
    List,
    Update,
    Delete,
    Restore,
}

#[derive(Default)]
struct DirectoryState {
    next_id: usize,
    users: BTreeMap<String, Map<String, Value>>,
    deleted: BTreeMap<String, Map<String, Value>>,
    failing: HashSet<DirectoryRoute>,
}

type SharedState = Arc<Mutex<DirectoryState>>;

fn check_failing(state: &DirectoryState, route: DirectoryRoute) -> Result<(), StatusCode> {
    if state.failing.contains(&route) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(())
}

async fn create_user(
    State(state): State<SharedState>,
    Json(body): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let mut state = state.lock().unwrap();
    check_failing(&state, DirectoryRoute::Create)?;

    state.next_id += 1;
    let id = format!("user-{}", state.next_id);
    let mut user = body;
    user.insert("id".to_string(), Value::String(id.clone()));
    user.remove("passwordProfile");
    state.users.insert(id, user.clone());

    Ok((StatusCode::CREATED, Json(Value::Object(user))))
}

async fn list_users(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let state = state.lock().unwrap();
    check_failing(&state, DirectoryRoute::List)?;

    let users: Vec<Value> = state
        .users
        .values()
        .filter(|user| match query.get("jobTitle") {
            Some(title) => user.get("jobTitle").and_then(Value::as_str) == Some(title.as_str()),
            None => true,
        })
        .cloned()
        .map(Value::Object)
        .collect();

    Ok(Json(json!({ "value": users })))
}

async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let state = state.lock().unwrap();
    check_failing(&state, DirectoryRoute::Get)?;

    state
        .users
        .get(&id)
        .cloned()
        .map(|user| Json(Value::Object(user)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    if check_failing(&state, DirectoryRoute::Update).is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    match state.users.get_mut(&id) {
        Some(user) => {
            for (key, value) in body {
                user.insert(key, value);
            }
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn delete_user(State(state): State<SharedState>, Path(id): Path<String>) -> StatusCode {
    let mut state = state.lock().unwrap();
    if check_failing(&state, DirectoryRoute::Delete).is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    match state.users.remove(&id) {
        Some(user) => {
            state.deleted.insert(id, user);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn restore_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let mut state = state.lock().unwrap();
    check_failing(&state, DirectoryRoute::Restore)?;

    let user = state.deleted.remove(&id).ok_or(StatusCode::NOT_FOUND)?;
    state.users.insert(id, user.clone());
    Ok(Json(Value::Object(user)))
}

/// A running fake directory. The server shuts down when this is dropped.
pub struct FakeDirectory {
    pub base_url: String,
    state: SharedState,
    _shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeDirectory {
    /// Binds a random port on 127.0.0.1 and serves the directory API from a
    /// background task.
    pub async fn spawn() -> Self {
        let state = SharedState::default();

        let app = Router::new()
            .route("/v1.0/users", post(create_user).get(list_users))
            .route(
                "/v1.0/users/{id}",
                get(get_user).patch(update_user).delete(delete_user),
            )
            .route("/v1.0/deletedItems/{id}/restore", post(restore_user))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake directory failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/v1.0", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Config of an identity fragment pointing at this directory.
    pub fn fragment_config(&self) -> DirectoryFragmentConfig {
        let mut config = DirectoryFragmentConfig::new(self.base_url.as_str(), DIRECTORY_DOMAIN);
        config.timeout_sec = 5;
        config
    }

    pub fn fail(&self, route: DirectoryRoute) {
        self.state.lock().unwrap().failing.insert(route);
    }

    pub fn recover(&self, route: DirectoryRoute) {
        self.state.lock().unwrap().failing.remove(&route);
    }

    /// Stored user as raw JSON, None when absent or deleted.
    pub fn user(&self, id: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(id)
            .cloned()
            .map(Value::Object)
    }

    pub fn is_deleted(&self, id: &str) -> bool {
        self.state.lock().unwrap().deleted.contains_key(id)
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    /// Inserts a user directly, bypassing the API.
    pub fn insert_user(&self, id: &str, user: Value) {
        let mut user = match user {
            Value::Object(map) => map,
            other => panic!("Directory users are JSON objects, got {}", other),
        };
        user.insert("id".to_string(), Value::String(id.to_string()));
        self.state.lock().unwrap().users.insert(id.to_string(), user);
    }
}

impl Drop for FakeDirectory {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
