use std::collections::HashMap;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{info, warn};

use super::session::RelaySession;
use crate::config::MultiplayerConfig;
use crate::error::GatewayError;
use crate::AppState;

/// Identifiers pulled from an accepted upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub room_key: String,
    pub participant: String,
}

/// Checks, in order, the endpoint path, the upgrade header and the two
/// required query parameters. Extra parameters are ignored.
pub fn validate(req: &HttpRequest, settings: &MultiplayerConfig) -> Result<Admission, GatewayError> {
    if req.path() != settings.path {
        return Err(GatewayError::RouteNotFound(req.path().to_string()));
    }

    let is_upgrade = req
        .headers()
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"));
    if !is_upgrade {
        return Err(GatewayError::ProtocolMismatch);
    }

    let query = web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();
    let param = |name: &str| query.get(name).filter(|value| !value.is_empty()).cloned();

    match (param(&settings.room_param), param(&settings.session_param)) {
        (Some(room_key), Some(participant)) => Ok(Admission { room_key, participant }),
        _ => Err(GatewayError::MissingParameters),
    }
}

/// Default service for the app: admits websocket connections on the
/// multiplayer endpoint and rejects everything else.
pub async fn admit(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let admission = validate(&req, &state.config.multiplayer).map_err(|e| {
        warn!("Rejected request to {}: {}", req.path(), e);
        e
    })?;

    let mut response = ws::handshake(&req).map_err(GatewayError::Handshake)?;

    let peer_addr = req
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    info!(
        "Admitting session {} from {} into room {}",
        admission.participant, peer_addr, admission.room_key
    );

    let room = state.registry.resolve(&admission.room_key);
    let session = RelaySession::new(
        admission.participant,
        state.registry.clone(),
        room,
        state.config.rooms.member_mailbox_capacity,
    );

    Ok(response.streaming(ws::WebsocketContext::create(session, stream)))
}
