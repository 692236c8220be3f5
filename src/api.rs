//! # Gallery HTTP API
//!
//! Questo modulo espone la pipeline di upload e lo store via HTTP (axum).
//!
//! ## Endpoint:
//! - `GET  /api/icons`: tutte le icone
//! - `GET  /api/categories`: tutte le categorie
//! - `GET  /api/structure`: categoria → file
//! - `GET  /api/info?category=&fileName=`: dettagli di un'icona
//! - `POST /api/upload`: upload multipart/form-data
//! - `POST /api/delete`: `{ "fileName", "category" }`
//! - `GET  /icons/*`: file statici dalla directory delle icone (file nascosti esclusi)
//!
//! ## Mappatura errori:
//! - `Validation` / `MalformedMultipart` → 400
//! - `NotFound` → 404
//! - `DuplicateFile` → 409
//! - tutto il resto → 500 con messaggio generico
//!
//! Ogni errore ha body `{ "success": false, "error": "..." }`.

use crate::config::Config;
use crate::error::{IconError, IconResult};
use crate::json_output::{error_envelope, success_envelope};
use crate::multipart;
use crate::store::CategoryStore;
use crate::types::{DeleteResult, UploadRequest, UploadResult};
use crate::upload::UploadPipeline;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeader,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, error, info, warn, Level};

/// Headroom for multipart headers and form fields on top of the file itself
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

const ICON_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<UploadPipeline>,
}

impl AppState {
    pub fn new(pipeline: UploadPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

impl IconError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IconError::Validation(_) | IconError::MalformedMultipart(_) => StatusCode::BAD_REQUEST,
            IconError::NotFound { .. } => StatusCode::NOT_FOUND,
            IconError::DuplicateFile { .. } => StatusCode::CONFLICT,
            IconError::Io(_) | IconError::Image(_) | IconError::Compression(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand to a client
    pub fn user_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "Internal server error".to_string()
        }
    }
}

impl IntoResponse for IconError {
    fn into_response(self) -> Response {
        match &self {
            IconError::DuplicateFile { .. } => warn!("Conflict: {}", self),
            e if e.is_client_error() => debug!("Client error: {}", self),
            _ => error!("Internal error: {}", self),
        }

        (self.status_code(), Json(error_envelope(self.user_message()))).into_response()
    }
}

/// Build the router for `config`
pub fn router(state: AppState, config: &Config) -> Router {
    let upload_limit = config.max_file_size.saturating_add(MULTIPART_OVERHEAD);
    let upload_limit = usize::try_from(upload_limit).unwrap_or(usize::MAX);

    let served = SetResponseHeader::if_not_present(
        ServeDir::new(&config.icons_root),
        header::CACHE_CONTROL,
        HeaderValue::from_static(ICON_CACHE_CONTROL),
    );
    let icons = Router::new()
        .fallback_service(served)
        .layer(middleware::from_fn(hide_dotfiles));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/icons", get(list_icons))
        .route("/api/categories", get(list_categories))
        .route("/api/structure", get(get_structure))
        .route("/api/info", get(file_info))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/delete", post(delete_icon))
        .nest_service("/icons", icons)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &Config, bind: &str) -> anyhow::Result<()> {
    let pipeline = UploadPipeline::new(config);
    let app = router(AppState::new(pipeline), config);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("🚀 Icon server listening on http://{}", listener.local_addr()?);
    info!("📁 Serving icons from {}", config.icons_root.display());

    axum::serve(listener, app).await?;
    Ok(())
}

/// 404 for any path segment naming a hidden entry (`.gitkeep`, `.upload-*.tmp`)
async fn hide_dotfiles(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
    });
    if hidden {
        debug!("Refusing hidden path {}", request.uri().path());
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// Run a directory scan off the async worker threads
async fn scan<T, F>(state: &AppState, f: F) -> IconResult<T>
where
    T: Send + 'static,
    F: FnOnce(&CategoryStore) -> IconResult<T> + Send + 'static,
{
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || f(pipeline.store()))
        .await
        .map_err(|e| IconError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

async fn list_icons(State(state): State<AppState>) -> IconResult<Json<Value>> {
    let icons = scan(&state, |store| store.list_all()).await?;
    Ok(Json(success_envelope("icons", icons)))
}

async fn list_categories(State(state): State<AppState>) -> IconResult<Json<Value>> {
    let categories = scan(&state, |store| store.list_categories()).await?;
    Ok(Json(success_envelope("categories", categories)))
}

async fn get_structure(State(state): State<AppState>) -> IconResult<Json<Value>> {
    let structure = scan(&state, |store| store.get_structure()).await?;
    Ok(Json(success_envelope("structure", structure)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfoQuery {
    category: String,
    file_name: String,
}

async fn file_info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> IconResult<Json<Value>> {
    let icon = state
        .pipeline
        .store()
        .file_info(&query.category, &query.file_name)
        .await?;
    Ok(Json(success_envelope("icon", icon)))
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> IconResult<Json<UploadResult>> {
    let boundary = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .and_then(multipart::boundary_from_content_type)
        .ok_or_else(|| IconError::validation("Invalid content type"))?;

    let parts = multipart::parse(&body, &boundary)?;
    let request = UploadRequest::from_parts(parts)?;
    debug!(
        "Upload request: {} ({} bytes) -> {}",
        request.original_filename,
        request.file_bytes.len(),
        request.category
    );

    let result = state.pipeline.upload(request).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBody {
    file_name: String,
    category: String,
}

async fn delete_icon(
    State(state): State<AppState>,
    Json(body): Json<DeleteBody>,
) -> IconResult<Json<DeleteResult>> {
    let result = state
        .pipeline
        .delete(&body.file_name, &body.category)
        .await?;
    Ok(Json(result))
}
