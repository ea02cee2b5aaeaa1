//! Stateless HTTP request builder and response parser for the planner API.
//!
//! # Design
//! `ApiClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Collection operations are generic over `Resource`, so the four
//! collections share one mapping: `GET /{r}`, `POST /{r}`, `PUT /{r}/{id}`,
//! `DELETE /{r}/{id}`. The builder never adds credentials; that is the job
//! of `AuthorizedClient`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{extract_server_message, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::resources::{RecordId, Resource};
use crate::types::{AuthResponse, Confirmation, Credentials, Registration};

/// Synchronous, stateless request builder for the planner API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/login".to_string(), credentials)
    }

    pub fn build_register(&self, registration: &Registration) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/register".to_string(), registration)
    }

    /// Parse the `{ token, user }` body shared by login and register.
    pub fn parse_auth(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn build_list<R: Resource>(&self) -> HttpRequest {
        self.empty_request(HttpMethod::Get, format!("/{}", R::COLLECTION.path()))
    }

    pub fn build_create<R: Resource>(&self, draft: &R::Draft) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, format!("/{}", R::COLLECTION.path()), draft)
    }

    pub fn build_update<R: Resource>(
        &self,
        id: &RecordId,
        draft: &R::Draft,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Put,
            format!("/{}/{id}", R::COLLECTION.path()),
            draft,
        )
    }

    pub fn build_delete<R: Resource>(&self, id: &RecordId) -> HttpRequest {
        self.empty_request(HttpMethod::Delete, format!("/{}/{id}", R::COLLECTION.path()))
    }

    pub fn parse_list<R: Resource>(&self, response: HttpResponse) -> Result<Vec<R>, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    /// Parse the single record returned by create and update.
    pub fn parse_record<R: Resource>(&self, response: HttpResponse) -> Result<R, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<Confirmation, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Confirmation::default());
        }
        // Some servers echo the deleted record instead of a message.
        Ok(serde_json::from_str(&response.body).unwrap_or_default())
    }

    fn empty_request(&self, method: HttpMethod, path: String) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: String,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let message = extract_server_message(&response.body);
    match response.status {
        401 => Err(ApiError::Unauthorized { message }),
        404 => Err(ApiError::NotFound { message }),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
            message,
        }),
    }
}
