use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::health::{HealthResponse, RoomDetailResponse, StatsResponse},
    error::AppError,
    services::health_service,
    state::{SharedState, game::RoomId},
};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
/// Return the current health status with player, room and game counters.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(health_service::health_status(&state))
}

#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "health",
    responses((status = 200, description = "Active rooms and running games", body = StatsResponse))
)]
/// List active rooms and running games.
pub async fn server_stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    Json(health_service::stats(&state))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}",
    tag = "health",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room details", body = RoomDetailResponse),
        (status = 404, description = "Unknown room")
    )
)]
/// Describe a single room.
pub async fn room_details(
    State(state): State<SharedState>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomDetailResponse>, AppError> {
    let details = health_service::room_stats(&state, &room_id)?;
    Ok(Json(details))
}

/// Configure the health and statistics routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/healthcheck", get(healthcheck))
        .route("/api/stats", get(server_stats))
        .route("/api/rooms/{room_id}", get(room_details))
}
