//! `GET /api/stream/:id`: resolve audio and redirect or relay it

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::server::AppState;
use crate::resolver::{AudioStream, ByteRange, Resolution};
use crate::tracks::VideoId;

pub async fn stream_audio(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let id = VideoId::parse(&id)?;
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(ByteRange::parse);

    let span = tracing::info_span!("stream", request_id = %Uuid::new_v4(), video = %id);
    async move {
        tracing::debug!("Range: {:?}", range);
        match state.cascade.resolve(&id, range).await {
            Ok(Resolution::Redirect(url)) => Ok((
                StatusCode::FOUND,
                [(header::LOCATION, url), (header::CACHE_CONTROL, "no-store".to_string())],
            )
                .into_response()),
            Ok(Resolution::Stream(stream)) => relay_response(stream, range),
            Err(e) => {
                tracing::error!("Streaming failed: {}", e);
                Err(ApiError::internal("Streaming failed"))
            }
        }
    }
    .instrument(span)
    .await
}

fn relay_response(stream: AudioStream, range: Option<ByteRange>) -> ApiResult<Response> {
    let delivery = stream.delivery(range);
    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, stream.content_type.as_str())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "no-store");

    builder = match delivery.content_range() {
        Some(span) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, span.to_string()),
        None => builder.status(StatusCode::OK),
    };
    if let Some(length) = delivery.content_length() {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    let body = Body::from_stream(stream.into_body(delivery));
    builder.body(body).map_err(|e| {
        tracing::error!("Failed to build stream response: {}", e);
        ApiError::internal("Streaming failed")
    })
}
