//! HTTP handlers and their error mapping.
//!
//! - `GET /companies` lists everything, or looks one company up when both
//!   `name` and `zipcode` are given
//! - `POST /companies/websites` merges websites from the multipart field `data`
//! - `GET /health` liveness probe

use crate::io::{build_csv_reader, CsvMeta};
use crate::parser::IngestSummary;
use crate::server::AppState;
use crate::CatalogError;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

/// Name of the multipart field carrying the merge file.
pub const UPLOAD_FIELD: &str = "data";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Not found")]
    RouteNotFound,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(CatalogError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(CatalogError::NotFound) => StatusCode::NO_CONTENT,
            ApiError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(err) => err.status(),
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Catalog(CatalogError::Validation(_)) => "VALIDATION_ERROR",
            ApiError::Catalog(CatalogError::NotFound) => "NOT_FOUND",
            ApiError::Catalog(CatalogError::Storage(_)) => "STORAGE_ERROR",
            ApiError::Catalog(CatalogError::Io(_) | CatalogError::Csv(_)) => "STREAM_ERROR",
            ApiError::Multipart(_) => "UPLOAD_ERROR",
            ApiError::RouteNotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::NO_CONTENT {
            tracing::debug!("company not found");
            return status.into_response();
        }
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CompanyQuery {
    pub name: Option<String>,
    pub zipcode: Option<String>,
}

/// `GET /companies`
pub async fn find_companies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompanyQuery>,
) -> ApiResult<Response> {
    match (query.name, query.zipcode) {
        (None, None) => Ok(Json(state.service.list_all().await?).into_response()),
        (Some(name), Some(zipcode)) => {
            let company = state.service.find_by_name_and_zip(&name, &zipcode).await?;
            Ok(Json(company).into_response())
        }
        _ => Err(ApiError::BadRequest(
            "Missing parameters 'name' or 'zipcode'".to_string(),
        )),
    }
}

/// `POST /companies/websites`
pub async fn load_websites(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<IngestSummary>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let meta = CsvMeta::for_upload(field.content_type(), field.file_name());
        let data = field.bytes().await?;
        tracing::debug!(bytes = data.len(), source = %meta.name_hint, "website file received");

        let mut reader = build_csv_reader(Cursor::new(data), &meta);
        let summary = state.service.merge_websites(&mut *reader).await?;
        return Ok(Json(summary));
    }
    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{UPLOAD_FIELD}'"
    )))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}
