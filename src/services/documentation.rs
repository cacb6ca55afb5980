use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the door quiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::health::server_stats,
        crate::routes::health::room_details,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStats,
            crate::dto::health::StatsResponse,
            crate::dto::health::RoomStats,
            crate::dto::health::GameStats,
            crate::dto::health::RoomDetailResponse,
            crate::state::state_machine::GamePhase,
            crate::state::game::Door,
        )
    ),
    tags(
        (name = "health", description = "Health check and statistics endpoints"),
        (name = "players", description = "WebSocket endpoint for game clients"),
    )
)]
pub struct ApiDoc;
