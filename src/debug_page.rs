//! Manual test page that draws every participant's cursor in a demo room.

use actix_web::{http::header::ContentType, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::config::MultiplayerConfig;
use crate::AppState;

/// Room every debug page joins, so separate windows see each other.
pub const DEBUG_ROOM: &str = "b843a508-eb21-45fe-bf4c-276e520d1735";

const TEMPLATE: &str = include_str!("../static/debug.html");

/// Websocket URL for a fresh debug participant.
pub fn socket_url(host: &str, settings: &MultiplayerConfig) -> String {
    format!(
        "ws://{}{}?{}={}&{}={}&version=50&user_id={}",
        host,
        settings.path,
        settings.room_param,
        DEBUG_ROOM,
        settings.session_param,
        Uuid::new_v4(),
        Uuid::new_v4(),
    )
}

pub async fn debug_page(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let url = socket_url(req.connection_info().host(), &state.config.multiplayer);

    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(TEMPLATE.replace("__WS_URL__", &url))
}
