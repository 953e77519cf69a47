use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use cinelog_core::error::ApiError;
use cinelog_core::types::{DirectoryKind, ImportReport, ScanStats};
use cinelog_db::repo;
use cinelog_scanner::scan::ScanError;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        // Movies
        .route("/movies", get(list_movies))
        .route("/movies/{id}", get(get_movie).delete(delete_movie))
        .route("/movies/{id}/rating", axum::routing::patch(update_rating))
        .route("/movies/{id}/favorite", post(toggle_favorite))
        .route(
            "/movies/{id}/custom-fields/{field_id}",
            put(set_custom_field_value),
        )
        .route(
            "/movies/{id}/tags/{tag_id}",
            post(attach_tag).delete(detach_tag),
        )
        // Directories
        .route("/directories", get(list_directories).post(add_directory))
        .route("/directories/{id}", delete(remove_directory))
        // Settings
        .route("/settings/{key}", get(get_setting).put(set_setting))
        // Tags
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", axum::routing::patch(rename_tag).delete(delete_tag))
        // Custom fields
        .route(
            "/custom-fields",
            get(list_custom_fields).post(create_custom_field),
        )
        .route("/custom-fields/{id}", delete(delete_custom_field))
        // Scan / import
        .route("/scan/videos", post(scan_videos))
        .route("/scan/import", post(import_nfo))
        .route("/scan/cancel", post(cancel_scan))
        .route("/scan/status", get(scan_status))
        .route("/scan/events", get(sse_events))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn db_err(e: sqlx::Error) -> AppError {
    ApiError::Internal(format!("db error: {e}")).into()
}

fn scan_err(e: ScanError) -> AppError {
    match e {
        ScanError::AlreadyRunning => ApiError::Conflict(e.to_string()),
        ScanError::InaccessibleDirectories(_) => ApiError::BadRequest(e.to_string()),
        ScanError::Db(inner) => ApiError::Internal(format!("db error: {inner}")),
    }
    .into()
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

/// Browsing filter as query parameters; id-set filters are comma-separated.
#[derive(Debug, Default, Deserialize)]
struct MovieListQuery {
    search: Option<String>,
    year_from: Option<i64>,
    year_to: Option<i64>,
    rating_from: Option<f64>,
    rating_to: Option<f64>,
    is_favorite: Option<bool>,
    genres: Option<String>,
    tags: Option<String>,
    actors: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

fn parse_id_list(raw: Option<&str>) -> Option<Vec<i64>> {
    let raw = raw?;
    let ids: Vec<i64> = raw
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    (!ids.is_empty()).then_some(ids)
}

async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<MovieListQuery>,
) -> Result<Json<repo::movies::MoviePage>, AppError> {
    let filter = repo::movies::MovieFilter {
        search: query.search,
        year_from: query.year_from,
        year_to: query.year_to,
        rating_from: query.rating_from,
        rating_to: query.rating_to,
        is_favorite: query.is_favorite,
        genres: parse_id_list(query.genres.as_deref()),
        tags: parse_id_list(query.tags.as_deref()),
        actors: parse_id_list(query.actors.as_deref()),
        sort_by: query.sort_by,
        sort_order: query.sort_order,
        page: query.page,
        page_size: query.page_size,
    };

    let page = repo::movies::list_movies(&state.db, &filter)
        .await
        .map_err(db_err)?;
    Ok(Json(page))
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<repo::movies::MovieDetail>, AppError> {
    let detail = repo::movies::get_movie_detail(&state.db, id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ApiError::NotFound("movie not found".into()))?;
    Ok(Json(detail))
}

async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<axum::http::StatusCode, AppError> {
    let deleted = repo::movies::delete_movie(&state.db, id)
        .await
        .map_err(db_err)?;
    if !deleted {
        return Err(ApiError::NotFound("movie not found".into()).into());
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct RatingBody {
    rating: f64,
}

async fn update_rating(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<RatingBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !(0.0..=10.0).contains(&body.rating) {
        return Err(ApiError::BadRequest("rating must be between 0 and 10".into()).into());
    }
    let updated = repo::movies::update_rating(&state.db, id, body.rating)
        .await
        .map_err(db_err)?;
    if !updated {
        return Err(ApiError::NotFound("movie not found".into()).into());
    }
    Ok(Json(serde_json::json!({ "id": id, "rating": body.rating })))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let favorite = repo::movies::toggle_favorite(&state.db, id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ApiError::NotFound("movie not found".into()))?;
    Ok(Json(serde_json::json!({ "id": id, "is_favorite": favorite })))
}

#[derive(Deserialize)]
struct ValueBody {
    value: String,
}

async fn set_custom_field_value(
    State(state): State<AppState>,
    Path((id, field_id)): Path<(i64, i64)>,
    Json(body): Json<ValueBody>,
) -> Result<axum::http::StatusCode, AppError> {
    repo::movies::get_movie(&state.db, id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ApiError::NotFound("movie not found".into()))?;
    repo::custom_fields::set_value(&state.db, id, field_id, &body.value)
        .await
        .map_err(db_err)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DirectoryListQuery {
    kind: Option<String>,
}

async fn list_directories(
    State(state): State<AppState>,
    Query(query): Query<DirectoryListQuery>,
) -> Result<Json<Vec<repo::directories::DirectoryRow>>, AppError> {
    let kind = match query.kind.as_deref() {
        Some(raw) => Some(
            DirectoryKind::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown directory kind: {raw}")))?,
        ),
        None => None,
    };
    let dirs = repo::directories::list(&state.db, kind)
        .await
        .map_err(db_err)?;
    Ok(Json(dirs))
}

#[derive(Deserialize)]
struct AddDirectoryBody {
    path: String,
    kind: String,
    #[serde(default)]
    label: String,
}

async fn add_directory(
    State(state): State<AppState>,
    Json(body): Json<AddDirectoryBody>,
) -> Result<(axum::http::StatusCode, Json<repo::directories::DirectoryRow>), AppError> {
    let kind = DirectoryKind::parse(&body.kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown directory kind: {}", body.kind)))?;
    if body.path.is_empty() {
        return Err(ApiError::BadRequest("path must not be empty".into()).into());
    }
    let dir = repo::directories::add(&state.db, &body.path, kind, &body.label)
        .await
        .map_err(db_err)?;
    Ok((axum::http::StatusCode::CREATED, Json(dir)))
}

async fn remove_directory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<axum::http::StatusCode, AppError> {
    let removed = repo::directories::remove(&state.db, id)
        .await
        .map_err(db_err)?;
    if !removed {
        return Err(ApiError::NotFound("directory not found".into()).into());
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let value = repo::settings::get(&state.db, &key).await.map_err(db_err)?;
    Ok(Json(serde_json::json!({ "key": key, "value": value })))
}

async fn set_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<ValueBody>,
) -> Result<axum::http::StatusCode, AppError> {
    repo::settings::set(&state.db, &key, &body.value)
        .await
        .map_err(db_err)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tags and custom fields
// ---------------------------------------------------------------------------

async fn list_tags(
    State(state): State<AppState>,
) -> Result<Json<Vec<repo::movies::TagRow>>, AppError> {
    let tags = repo::tags::list(&state.db).await.map_err(db_err)?;
    Ok(Json(tags))
}

#[derive(Deserialize)]
struct NameBody {
    name: String,
}

async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<NameBody>,
) -> Result<(axum::http::StatusCode, Json<repo::movies::TagRow>), AppError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("tag name must not be empty".into()).into());
    }
    let tag = repo::tags::create_custom(&state.db, body.name.trim())
        .await
        .map_err(db_err)?;
    Ok((axum::http::StatusCode::CREATED, Json(tag)))
}

async fn rename_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NameBody>,
) -> Result<axum::http::StatusCode, AppError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("tag name must not be empty".into()).into());
    }
    let renamed = repo::tags::rename(&state.db, id, body.name.trim())
        .await
        .map_err(db_err)?;
    if !renamed {
        return Err(ApiError::NotFound("tag not found".into()).into());
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<axum::http::StatusCode, AppError> {
    let deleted = repo::tags::delete(&state.db, id).await.map_err(db_err)?;
    if !deleted {
        return Err(ApiError::NotFound("tag not found".into()).into());
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn attach_tag(
    State(state): State<AppState>,
    Path((movie_id, tag_id)): Path<(i64, i64)>,
) -> Result<axum::http::StatusCode, AppError> {
    repo::movies::get_movie(&state.db, movie_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ApiError::NotFound("movie not found".into()))?;
    repo::tags::attach(&state.db, movie_id, tag_id)
        .await
        .map_err(db_err)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn detach_tag(
    State(state): State<AppState>,
    Path((movie_id, tag_id)): Path<(i64, i64)>,
) -> Result<axum::http::StatusCode, AppError> {
    repo::tags::detach(&state.db, movie_id, tag_id)
        .await
        .map_err(db_err)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn list_custom_fields(
    State(state): State<AppState>,
) -> Result<Json<Vec<repo::custom_fields::CustomFieldRow>>, AppError> {
    let fields = repo::custom_fields::list(&state.db).await.map_err(db_err)?;
    Ok(Json(fields))
}

#[derive(Deserialize)]
struct CreateFieldBody {
    name: String,
    #[serde(default = "default_field_type")]
    field_type: String,
}

fn default_field_type() -> String {
    "text".to_string()
}

async fn create_custom_field(
    State(state): State<AppState>,
    Json(body): Json<CreateFieldBody>,
) -> Result<(axum::http::StatusCode, Json<repo::custom_fields::CustomFieldRow>), AppError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("field name must not be empty".into()).into());
    }
    let field = repo::custom_fields::create(&state.db, body.name.trim(), &body.field_type)
        .await
        .map_err(db_err)?;
    Ok((axum::http::StatusCode::CREATED, Json(field)))
}

async fn delete_custom_field(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<axum::http::StatusCode, AppError> {
    let deleted = repo::custom_fields::delete(&state.db, id)
        .await
        .map_err(db_err)?;
    if !deleted {
        return Err(ApiError::NotFound("custom field not found".into()).into());
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Scan / import
// ---------------------------------------------------------------------------

async fn scan_videos(State(state): State<AppState>) -> Result<Json<ScanStats>, AppError> {
    let stats = state.scanner.scan_videos().await.map_err(scan_err)?;
    Ok(Json(stats))
}

#[derive(Debug, Default, Deserialize)]
struct ImportBody {
    force: Option<Vec<i64>>,
}

async fn import_nfo(
    State(state): State<AppState>,
    body: Option<Json<ImportBody>>,
) -> Result<Json<ImportReport>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let report = state
        .scanner
        .import_nfo(body.force.as_deref())
        .await
        .map_err(scan_err)?;
    Ok(Json(report))
}

#[derive(Serialize)]
struct ScanStatusResponse {
    running: bool,
}

async fn cancel_scan(State(state): State<AppState>) -> Json<ScanStatusResponse> {
    state.scanner.cancel();
    Json(ScanStatusResponse {
        running: state.scanner.is_running(),
    })
}

async fn scan_status(State(state): State<AppState>) -> Json<ScanStatusResponse> {
    Json(ScanStatusResponse {
        running: state.scanner.is_running(),
    })
}

// ---------------------------------------------------------------------------
// SSE progress feed
// ---------------------------------------------------------------------------

async fn sse_events(
    State(state): State<AppState>,
) -> axum::response::Sse<
    impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
> {
    use axum::response::sse::Event;
    use std::time::Duration;

    let mut rx = state.scanner.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(progress) => {
                    if let Ok(data) = serde_json::to_string(&progress) {
                        yield Ok(Event::default().event("scan_progress").data(data));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    yield Ok(Event::default()
                        .event("error")
                        .data(format!(r#"{{"lagged":{n}}}"#)));
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    axum::response::Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
