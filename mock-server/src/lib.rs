use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::AppendHeaders,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
pub struct UserFilter {
    pub active: Option<bool>,
}

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, User>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/status/{code}", any(status))
        .route("/echo", any(echo))
        .route("/bytes/{len}", get(bytes))
        .route("/cookies", get(cookies))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>, Query(filter): Query<UserFilter>) -> Json<Vec<User>> {
    let users = db.read().await;
    let mut matching: Vec<User> = users
        .values()
        .filter(|user| filter.active.map_or(true, |active| user.active == active))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name));
    Json(matching)
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> (StatusCode, Json<User>) {
    let user = User {
        id: Uuid::new_v4(),
        name: input.name,
        active: input.active,
    };
    log::debug!("created user {}", user.id);
    db.write().await.insert(user.id, user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn get_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, StatusCode> {
    let users = db.read().await;
    users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_user(State(db): State<Db>, Path(id): Path<Uuid>) -> StatusCode {
    match db.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Answer with the requested status code and an empty JSON object.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let code = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((code, Json(serde_json::json!({}))))
}

/// Upper bound for `/bytes/{len}`.
pub const MAX_BYTES: usize = 64 * 1024 * 1024;

/// Answer with `len` bytes of filler.
async fn bytes(Path(len): Path<usize>) -> Result<Vec<u8>, StatusCode> {
    if len > MAX_BYTES {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(vec![b'x'; len])
}

/// Answer with two `set-cookie` headers.
async fn cookies() -> (
    AppendHeaders<[(header::HeaderName, &'static str); 2]>,
    Json<serde_json::Value>,
) {
    (
        AppendHeaders([(header::SET_COOKIE, "a=1"), (header::SET_COOKIE, "b=2")]),
        Json(serde_json::json!({})),
    )
}

async fn echo(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ([(&'static str, &'static str); 1], Json<Echo>) {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let echo = Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    ([("x-echo", "1")], Json(echo))
}
