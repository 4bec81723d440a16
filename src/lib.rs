pub mod codec;
pub mod config;
pub mod debug_page;
pub mod error;
pub mod room;
pub mod websocket;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::{AppError, GatewayError, RoomError};
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use room::{RoomHandle, RoomRegistry, RoomSettings};

/// Health check endpoint handler
/// Returns server status, timestamp and the number of live rooms
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "rooms": state.registry.len(),
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub registry: RoomRegistry,
}

impl AppState {
    pub fn new(config: Settings) -> Self {
        let registry = RoomRegistry::new(config.rooms.room_settings());

        Self {
            config: Arc::new(config),
            registry,
        }
    }
}
