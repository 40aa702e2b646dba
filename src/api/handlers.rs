//! JSON API handlers

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::server::AppState;
use crate::cache::CacheStats;
use crate::constants::{DEFAULT_RESULT_LIMIT, MIN_QUERY_LEN, RELATED_SIZE, TRENDING_SIZE};
use crate::search::{validate_query, SearchKind};
use crate::tracks::{clamp_limit, Track, VideoId, VideoInfo};

/// Track list response
#[derive(Debug, Serialize)]
pub struct TracksResponse {
    pub tracks: Vec<Track>,
}

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub video: VideoInfo,
}

#[derive(Debug, Serialize)]
pub struct CacheSizes {
    pub trending: CacheStats,
    pub search: CacheStats,
}

/// Service status
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
    pub strategies: Vec<&'static str>,
    pub uptime_seconds: u64,
    pub caches: CacheSizes,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArtistParams {
    pub artist: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenreParams {
    pub genre: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelatedParams {
    pub q: Option<String>,
    pub single: Option<String>,
    pub limit: Option<String>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    let (trending, search) = state.catalog.cache_stats();
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.catalog.backend_name(),
        strategies: state.cascade.strategy_names(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        caches: CacheSizes { trending, search },
    })
}

/// `GET /api/search?q=&limit=&type=`
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<TracksResponse>> {
    let query = validate_query(params.q.as_deref(), "Search query", MIN_QUERY_LEN)?;
    let kind = SearchKind::from_param(params.kind.as_deref());
    let limit = clamp_limit(params.limit.as_deref(), DEFAULT_RESULT_LIMIT);

    let tracks = state
        .catalog
        .search(kind, &query, limit)
        .await
        .map_err(|e| ApiError::from_search(e, "Failed to search"))?;
    Ok(Json(TracksResponse { tracks }))
}

/// `GET /api/trending?limit=`
pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<TracksResponse>> {
    let limit = clamp_limit(params.limit.as_deref(), TRENDING_SIZE);
    let tracks = state
        .catalog
        .trending(limit)
        .await
        .map_err(|e| ApiError::from_search(e, "Failed to fetch trending songs"))?;
    Ok(Json(TracksResponse { tracks }))
}

/// `GET /api/artist?artist=&limit=`
pub async fn artist(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ArtistParams>,
) -> ApiResult<Json<TracksResponse>> {
    let artist = validate_query(params.artist.as_deref(), "Artist", 1)?;
    let limit = clamp_limit(params.limit.as_deref(), DEFAULT_RESULT_LIMIT);
    let tracks = state
        .catalog
        .by_artist(&artist, limit)
        .await
        .map_err(|e| ApiError::from_search(e, "Failed to fetch artist tracks"))?;
    Ok(Json(TracksResponse { tracks }))
}

/// `GET /api/genre?genre=&limit=`
pub async fn genre(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GenreParams>,
) -> ApiResult<Json<TracksResponse>> {
    let genre = validate_query(params.genre.as_deref(), "Genre", 1)?;
    let limit = clamp_limit(params.limit.as_deref(), DEFAULT_RESULT_LIMIT);
    let tracks = state
        .catalog
        .by_genre(&genre, limit)
        .await
        .map_err(|e| ApiError::from_search(e, "Failed to fetch genre tracks"))?;
    Ok(Json(TracksResponse { tracks }))
}

/// `GET /api/related/:id?q=&single=&limit=`
///
/// With `single=true` one related track is picked at random and returned
/// bare instead of wrapped in a list.
pub async fn related(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<RelatedParams>,
) -> ApiResult<Response> {
    let id = VideoId::parse(&id)?;
    let limit = clamp_limit(params.limit.as_deref(), RELATED_SIZE);

    let tracks = state
        .catalog
        .related(&id, params.q.as_deref(), limit)
        .await
        .map_err(|e| ApiError::from_search(e, "Failed to fetch related videos"))?;

    if params.single.as_deref() == Some("true") {
        let pick = tracks
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| ApiError::not_found("No related videos found"))?;
        return Ok(Json(pick).into_response());
    }
    Ok(Json(TracksResponse { tracks }).into_response())
}

/// `GET /api/video/:id`
pub async fn video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let id = VideoId::parse(&id)?;
    let video = state
        .catalog
        .video_info(&id)
        .await
        .map_err(|e| ApiError::from_search(e, "Failed to fetch video info"))?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(Json(VideoResponse { video }))
}
