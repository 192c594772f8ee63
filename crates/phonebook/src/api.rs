//! HTTP API endpoints

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, MethodRouter, Router},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::contact::{Contact, NewContact};
use crate::directory::{Directory, DirectoryError, DirectoryInfo};
use crate::metrics::DirectoryMetrics;

#[derive(Clone)]
pub struct ApiState {
    pub directory: Arc<Directory>,
    pub metrics: Arc<DirectoryMetrics>,
    pub max_body_bytes: usize,
}

/// JSON error body shared by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error returned from handlers, rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn person_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "person not found")
    }

    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
    }

    pub fn unreadable_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "failed to read request body")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            DirectoryError::Conflict { .. } => Self::new(StatusCode::CONFLICT, err.to_string()),
            DirectoryError::NotFound { .. } => Self::person_not_found(),
            DirectoryError::IdsExhausted => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Create API router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/persons", collection_routes())
        .route("/api/persons/", collection_routes())
        .route(
            "/api/persons/:id",
            get(get_person).delete(delete_person).fallback(unknown_endpoint),
        )
        .route("/info", get(info_page).fallback(unknown_endpoint))
        .route("/health", get(health_handler).fallback(unknown_endpoint))
        .route("/metrics", get(metrics_handler).fallback(unknown_endpoint))
        .fallback(unknown_endpoint)
        .with_state(state)
}

/// Unsupported methods on a known path answer like an unknown route
fn collection_routes() -> MethodRouter<ApiState> {
    get(list_persons).post(create_person).fallback(unknown_endpoint)
}

/// GET /api/persons - All contacts in insertion order
async fn list_persons(State(state): State<ApiState>) -> Json<Vec<Contact>> {
    Json(state.directory.list())
}

/// GET /info - Contact count and time of request
async fn info_page(State(state): State<ApiState>) -> Html<String> {
    Html(render_info(&state.directory.info()))
}

pub fn render_info(info: &DirectoryInfo) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px; max-width: 600px;">
    <h1>Phonebook Info</h1>
    <p>Phonebook has info for {} people</p>
    <p>Time of request: {}</p>
</div>
"#,
        info.count,
        info.generated_at.format("%a %b %e %Y %H:%M:%S GMT%z"),
    )
}

/// GET /api/persons/{id}
async fn get_person(
    State(state): State<ApiState>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Contact>, ApiError> {
    let id = path_id(raw_id)?;
    let contact = state.directory.get(id)?;
    Ok(Json(contact))
}

/// DELETE /api/persons/{id}
async fn delete_person(
    State(state): State<ApiState>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = path_id(raw_id)?;
    let (_, remaining) = state.directory.remove_with_len(id)?;

    info!("Deleted person with id: {}", id);
    state.metrics.contacts_deleted.inc();
    state.metrics.set_contacts(remaining);

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/persons - Create a contact
async fn create_person(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let payload = parse_new_contact(&headers, &body)?;
    let (contact, size) = state.directory.create_with_len(payload)?;

    info!(id = contact.id, name = %contact.name, number = %contact.number, "New person added");
    state.metrics.contacts_created.inc();
    state.metrics.set_contacts(size);

    Ok((StatusCode::CREATED, Json(contact)))
}

/// GET /health - Health check
async fn health_handler(State(state): State<ApiState>) -> Response {
    use serde_json::json;

    let response = json!({
        "status": "healthy",
        "contacts": state.directory.len(),
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, Json(response)).into_response()
}

/// GET /metrics - Prometheus text exposition
async fn metrics_handler(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let body = state.metrics.export_prometheus().map_err(|e| {
        error!("Metrics export error: {}", e);
        ApiError::internal()
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

async fn unknown_endpoint() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "unknown endpoint")
}

/// A segment that cannot even be decoded names no contact either
fn path_id(raw: Result<Path<String>, PathRejection>) -> Result<u64, ApiError> {
    match raw {
        Ok(Path(raw)) => parse_id(&raw),
        Err(rejection) => {
            debug!("Rejected person id segment: {}", rejection);
            Err(ApiError::person_not_found())
        }
    }
}

/// Ids that are not plain non-negative integers can never match a contact.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| ApiError::person_not_found())
}

/// Decode a create payload.
///
/// Bodies without a JSON content type, and empty bodies, count as an empty
/// payload so they fail field validation rather than parsing.
pub fn parse_new_contact(headers: &HeaderMap, body: &[u8]) -> Result<NewContact, ApiError> {
    if !is_json(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(NewContact::default());
    }

    serde_json::from_slice(body).map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))
}

pub(crate) fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}
