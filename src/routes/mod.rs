use axum::Router;

use crate::state::SharedState;

/// Swagger UI.
pub mod docs;
/// Health and statistics routes.
pub mod health;
/// Player WebSocket endpoint.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(websocket::router())
        .merge(docs::router())
        .with_state(state)
}
