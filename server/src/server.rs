use crate::catalog::query::DEFAULT_LIMIT;
use crate::catalog::{SearchQuery, VodError};
use crate::sharing::ImportOutcome;
use crate::{demo, AppState, RecordingEvent};
use axum::extract::ws::{Message, WebSocket};
use axum::{
    Json, Router,
    extract::{Path, Query, State, WebSocketUpgrade},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use squadov_vod::{RecordingSession, VodMetadata, VodRecord};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(state.allowed_origin.as_deref());
    Router::new()
        .route("/recordings/start", post(handle_start_recording))
        .route("/recordings/current", get(handle_current_recording))
        .route("/recordings/{session_id}/stop", post(handle_stop_recording))
        .route("/vods", get(handle_list_vods))
        .route("/vods/search", get(handle_search_vods))
        .route("/vods/favorites", get(handle_favorites))
        .route("/vods/stats", get(handle_stats))
        .route("/vods/import", post(handle_import))
        .route(
            "/vods/{id}",
            get(handle_get_vod).put(handle_update_vod).delete(handle_delete_vod),
        )
        .route("/vods/{id}/favorite", post(handle_toggle_favorite))
        .route("/vods/{id}/export", post(handle_export))
        .route("/vods/{id}/share", get(handle_share_link))
        .route("/formats", get(handle_formats))
        .route("/demo/seed", post(handle_seed))
        .route("/ws/events", get(handle_websocket_events))
        .layer(cors)
        .with_state(state)
}

/// Only the configured presentation-layer origin may make cross-origin calls
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    match allowed_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Some(Err(e)) => {
            warn!("Ignoring unusable allowed origin: {}", e);
            CorsLayer::new()
        }
        None => CorsLayer::new(),
    }
}

/// A `VodError` on its way out as a JSON error body
pub struct ApiError(VodError);

impl From<VodError> for ApiError {
    fn from(e: VodError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            error!("❌ Request failed: {}", self.0);
        } else {
            debug!("Request rejected ({}): {}", status, self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    game_id: String,
    #[serde(default)]
    game_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    session_id: String,
}

/// Blank fields fall back to generated text; send `{}` for all defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StopRequest {
    title: String,
    description: String,
}

/// `userId` absent means the current user; present but empty means everyone
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListParams {
    user_id: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchParams {
    user_id: Option<String>,
    q: Option<String>,
    game_id: Option<String>,
    /// Comma separated
    tags: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DeleteParams {
    delete_file: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest {
    destination: PathBuf,
    #[serde(default)]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest {
    source_path: PathBuf,
    #[serde(default)]
    metadata: Option<VodMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default = "default_seed_count")]
    count: usize,
}

fn default_seed_count() -> usize {
    10
}

fn resolve_user(state: &AppState, requested: Option<String>) -> String {
    requested.unwrap_or_else(|| state.identity.current_user_id())
}

async fn handle_start_recording(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> ApiResult<(StatusCode, Json<StartResponse>)> {
    info!("📡 Start recording requested for {}", request.game_id);
    let session_id = state
        .sessions
        .start_recording(&request.game_id, &request.game_name)
        .await?;
    Ok((StatusCode::CREATED, Json(StartResponse { session_id })))
}

async fn handle_stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<StopRequest>,
) -> ApiResult<Json<VodRecord>> {
    match state
        .sessions
        .stop_recording(&session_id, &request.title, &request.description)
        .await?
    {
        Some(record) => Ok(Json(record)),
        None => Err(VodError::NotFound(format!("Recording session {}", session_id)).into()),
    }
}

async fn handle_current_recording(State(state): State<AppState>) -> Json<Option<RecordingSession>> {
    Json(state.sessions.current_session().await)
}

async fn handle_list_vods(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<VodRecord>>> {
    let user_id = resolve_user(&state, params.user_id);
    let records = state
        .catalog
        .list(
            &user_id,
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(records))
}

async fn handle_search_vods(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<VodRecord>>> {
    let user_id = resolve_user(&state, params.user_id);
    let mut query = SearchQuery::default().limit(params.limit.unwrap_or(DEFAULT_LIMIT));
    if let Some(text) = params.q {
        query = query.text(text);
    }
    if let Some(game_id) = params.game_id {
        query = query.game(game_id);
    }
    if let Some(tags) = params.tags {
        query = query.tags(
            tags.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
    }

    Ok(Json(state.catalog.search(&user_id, &query).await?))
}

async fn handle_favorites(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<VodRecord>>> {
    let user_id = resolve_user(&state, params.user_id);
    let records = state
        .catalog
        .favorites(&user_id, params.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(records))
}

async fn handle_stats(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let user_id = resolve_user(&state, params.user_id);
    Ok(Json(state.catalog.stats(&user_id).await?))
}

async fn handle_get_vod(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VodRecord>> {
    Ok(Json(state.catalog.get(&id).await?))
}

/// Replace a VOD's editable fields; the id in the path wins over the body
async fn handle_update_vod(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut metadata): Json<VodMetadata>,
) -> ApiResult<Json<VodRecord>> {
    let stored = state.catalog.get(&id).await?;
    metadata.id = id.clone();
    // File locations are owned by the catalog, not the client
    metadata.file_path = stored.metadata.file_path;
    metadata.thumbnail_path = stored.metadata.thumbnail_path;
    state.catalog.update(&metadata).await?;
    info!("📝 Updated VOD {}", id);
    Ok(Json(state.catalog.get(&id).await?))
}

async fn handle_delete_vod(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<StatusCode> {
    state.catalog.delete(&id, params.delete_file).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VodRecord>> {
    Ok(Json(state.catalog.toggle_favorite(&id).await?))
}

async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<impl IntoResponse> {
    let path = state
        .sharing
        .export(&id, &request.destination, request.include_metadata)
        .await?;
    Ok(Json(json!({ "path": path })))
}

async fn handle_share_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let link = state.sharing.generate_share_link(&id).await?;
    Ok(Json(json!({ "link": link })))
}

async fn handle_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> (StatusCode, Json<ImportOutcome>) {
    let result = state.sharing.import(&request.source_path, request.metadata).await;
    let status = match &result {
        Ok(_) => StatusCode::CREATED,
        Err(e) => {
            warn!("Import of {:?} failed: {}", request.source_path, e);
            e.status_code()
        }
    };
    (status, Json(ImportOutcome::from(result)))
}

async fn handle_formats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sharing.supported_formats())
}

async fn handle_seed(
    State(state): State<AppState>,
    Json(request): Json<SeedRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = resolve_user(&state, request.user_id);
    let ids = demo::seed_catalog(
        state.catalog.as_ref(),
        state.scratch_dir(),
        &user_id,
        request.count,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "ids": ids }))))
}

async fn handle_websocket_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("📡 WebSocket upgrade request for /ws/events");
    ws.on_upgrade(move |socket| handle_event_stream(socket, state))
}

/// Forward recording events as JSON text frames until either side goes away
async fn handle_event_stream(socket: WebSocket, state: AppState) {
    info!("🔌 WebSocket connection established for events");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.sessions.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event: RecordingEvent = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event subscriber lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode recording event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sender.send(Message::Text(text.into())).await {
                    debug!("Event socket send failed: {}", e);
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("🔌 Event socket closed by client");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {
                        debug!("Ignoring inbound message on event socket");
                    }
                }
            }
        }
    }

    let _ = sender.close().await;
    info!("🔌 Event WebSocket connection ended");
}
