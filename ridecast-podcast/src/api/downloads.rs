//! Transient download handles
//!
//! GET /downloads/:handle serves the bytes registered by artifact delivery
//! until the handle is revoked.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// GET /downloads/:handle
pub async fn serve_download(
    State(state): State<AppState>,
    Path(handle): Path<Uuid>,
) -> ApiResult<Response> {
    let object = state
        .downloads
        .get(&handle)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Download not found or expired: {}", handle)))?;

    tracing::debug!(handle = %handle, filename = %object.filename, "Serving podcast download");

    Ok((
        [
            (header::CONTENT_TYPE, object.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                object.disposition.header_value(&object.filename),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        object.bytes,
    )
        .into_response())
}

pub fn download_routes() -> Router<AppState> {
    Router::new().route("/downloads/:handle", get(serve_download))
}
