//! In-memory planner backend for local runs and integration tests.
//!
//! Users register and log in to receive an unsigned JWT-shaped token; every
//! collection route requires it as a bearer credential. Records are stored
//! per user as loose JSON objects.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const COLLECTIONS: [&str; 4] = ["todos", "notes", "events", "reminders"];

const SIGNATURE: &str = "mock";

#[derive(Clone, Debug)]
struct User {
    id: String,
    name: String,
    email: String,
    password: String,
}

pub struct AppState {
    users: RwLock<HashMap<String, User>>,
    records: RwLock<HashMap<(String, &'static str), Vec<Map<String, Value>>>>,
    token_ttl: Duration,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(token_ttl: Duration) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            token_ttl,
        }
    }

    pub fn issue_token(&self, subject: &str, email: &str) -> String {
        let issued_at = Utc::now().timestamp();
        let ttl = i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX);
        token_for(subject, email, issued_at, issued_at.saturating_add(ttl))
    }
}

/// Unsigned JWT-shaped token: `header.payload.signature`, base64url parts.
pub fn token_for(subject: &str, email: &str, issued_at: i64, expires_at: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = json!({ "sub": subject, "email": email, "iat": issued_at, "exp": expires_at });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.{SIGNATURE}")
}

/// Error response with a `{"message": ...}` body.
struct Failure(StatusCode, Value);

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Failure(status, json!({ "message": message.into() }))
    }

    fn unauthorized() -> Self {
        Failure::new(StatusCode::UNAUTHORIZED, "Token is not valid")
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

pub fn app() -> Router {
    app_with_state(Arc::new(AppState::new(Duration::from_secs(3600))))
}

pub fn app_with_state(state: SharedState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/{collection}", get(list_records).post(create_record))
        .route("/api/{collection}/{id}", put(update_record).delete(delete_record))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, Arc::new(AppState::new(Duration::from_secs(3600)))).await
}

pub async fn run_with_state(listener: TcpListener, state: SharedState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

#[derive(Deserialize)]
struct RegisterInput {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct LoginInput {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register(
    State(state): State<SharedState>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<Value>, Failure> {
    let mut problems = Vec::new();
    if input.name.trim().is_empty() {
        problems.push(json!({ "msg": "Name is required" }));
    }
    if !input.email.contains('@') {
        problems.push(json!({ "msg": "Please include a valid email" }));
    }
    if input.password.len() < 6 {
        problems.push(json!({ "msg": "Password must be at least 6 characters" }));
    }
    if !problems.is_empty() {
        return Err(Failure(StatusCode::BAD_REQUEST, json!({ "errors": problems })));
    }

    let mut users = state.users.write().await;
    if users.contains_key(&input.email) {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "User already exists"));
    }
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        email: input.email,
        password: input.password,
    };
    users.insert(user.email.clone(), user.clone());
    tracing::info!(user = %user.id, "registered");
    Ok(Json(session_body(&state, &user)))
}

async fn login(
    State(state): State<SharedState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<Value>, Failure> {
    let users = state.users.read().await;
    match users.get(&input.email) {
        Some(user) if user.password == input.password => {
            tracing::info!(user = %user.id, "logged in");
            Ok(Json(session_body(&state, user)))
        }
        _ => Err(Failure::new(StatusCode::BAD_REQUEST, "Invalid credentials")),
    }
}

fn session_body(state: &AppState, user: &User) -> Value {
    json!({
        "token": state.issue_token(&user.id, &user.email),
        "user": { "id": user.id, "name": user.name, "email": user.email },
    })
}

/// Subject of a valid, unexpired bearer token.
fn authenticate(headers: &HeaderMap) -> Result<String, Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| Failure::new(StatusCode::UNAUTHORIZED, "No token, authorization denied"))?;

    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(SIGNATURE), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Failure::unauthorized());
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| Failure::unauthorized())?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| Failure::unauthorized())?;

    let expires_at = claims["exp"].as_i64().ok_or_else(Failure::unauthorized)?;
    if expires_at <= Utc::now().timestamp() {
        return Err(Failure::unauthorized());
    }
    claims["sub"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(Failure::unauthorized)
}

fn collection(name: &str) -> Result<&'static str, Failure> {
    COLLECTIONS
        .into_iter()
        .find(|c| *c == name)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Not found"))
}

fn label(collection: &str) -> &'static str {
    match collection {
        "todos" => "Todo",
        "notes" => "Note",
        "events" => "Event",
        _ => "Reminder",
    }
}

fn require_title(body: &Map<String, Value>) -> Result<(), Failure> {
    match body.get("title").and_then(Value::as_str) {
        Some(title) if !title.trim().is_empty() => Ok(()),
        _ => Err(Failure::new(StatusCode::BAD_REQUEST, "Title is required")),
    }
}

async fn list_records(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Map<String, Value>>>, Failure> {
    let owner = authenticate(&headers)?;
    let collection = collection(&name)?;
    let records = state.records.read().await;
    let items = records.get(&(owner, collection)).cloned().unwrap_or_default();
    Ok(Json(items))
}

async fn create_record(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Map<String, Value>>), Failure> {
    let owner = authenticate(&headers)?;
    let collection = collection(&name)?;
    require_title(&body)?;

    let now = Utc::now().to_rfc3339();
    body.insert("_id".to_string(), Value::String(Uuid::new_v4().to_string()));
    body.insert("user".to_string(), Value::String(owner.clone()));
    body.insert("createdAt".to_string(), Value::String(now.clone()));
    body.insert("updatedAt".to_string(), Value::String(now));

    let mut records = state.records.write().await;
    records.entry((owner, collection)).or_default().push(body.clone());
    tracing::debug!(collection, "record created");
    Ok((StatusCode::CREATED, Json(body)))
}

async fn update_record(
    State(state): State<SharedState>,
    Path((name, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Map<String, Value>>, Failure> {
    let owner = authenticate(&headers)?;
    let collection = collection(&name)?;
    require_title(&body)?;

    let mut records = state.records.write().await;
    let record = records
        .get_mut(&(owner, collection))
        .and_then(|items| items.iter_mut().find(|r| r["_id"] == id.as_str()))
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, format!("{} not found", label(collection))))?;

    for (key, value) in body {
        if !matches!(key.as_str(), "_id" | "id" | "user" | "createdAt") {
            record.insert(key, value);
        }
    }
    record.insert("updatedAt".to_string(), Value::String(Utc::now().to_rfc3339()));
    Ok(Json(record.clone()))
}

async fn delete_record(
    State(state): State<SharedState>,
    Path((name, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    let owner = authenticate(&headers)?;
    let collection = collection(&name)?;

    let mut records = state.records.write().await;
    let items = records.entry((owner, collection)).or_default();
    let before = items.len();
    items.retain(|r| r["_id"] != id.as_str());
    if items.len() == before {
        return Err(Failure::new(
            StatusCode::NOT_FOUND,
            format!("{} not found", label(collection)),
        ));
    }
    Ok(Json(json!({ "message": format!("{} removed", label(collection)) })))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn issued_token_authenticates_its_subject() {
        let state = AppState::new(Duration::from_secs(60));
        let token = state.issue_token("u1", "a@x.com");
        assert_eq!(authenticate(&bearer(&token)).ok().as_deref(), Some("u1"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let token = token_for("u1", "a@x.com", now - 120, now - 60);
        let Failure(status, body) = authenticate(&bearer(&token)).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Token is not valid");
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let state = AppState::new(Duration::from_secs(60));
        let token = state.issue_token("u1", "a@x.com").replace(".mock", ".forged");
        assert!(authenticate(&bearer(&token)).is_err());
    }

    #[test]
    fn missing_header_is_rejected() {
        let Failure(status, _) = authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unknown_collection_is_not_found() {
        assert!(collection("projects").is_err());
        assert_eq!(collection("events").ok(), Some("events"));
    }
}
