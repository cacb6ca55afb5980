/// OpenAPI documentation generation.
pub mod documentation;
/// Health and statistics reporting.
pub mod health_service;
/// Room admission, start countdown and game creation.
pub mod lobby;
/// Round state machine of a single game.
pub mod orchestrator;
/// Fan-out of server messages to room members.
pub mod room_events;
/// Background sweep of empty rooms.
pub mod room_janitor;
/// Score and leaderboard computation.
pub mod scoring;
/// Task owning a running game.
pub mod session_runner;
/// WebSocket connection and message handling service.
pub mod websocket_service;
