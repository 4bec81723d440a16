use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use actix_web_actors::ws::HandshakeError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Rejections produced while admitting a connection to the multiplayer endpoint.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("No route for {0}")]
    RouteNotFound(String),

    #[error("websocket expected")]
    ProtocolMismatch,

    // Reported with the same status as an unknown route.
    #[error("Missing room or session parameter")]
    MissingParameters,

    #[error("Websocket handshake failed: {0}")]
    Handshake(HandshakeError),
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        match self {
            // Not-found rejections carry no body.
            GatewayError::RouteNotFound(_) | GatewayError::MissingParameters => {
                HttpResponse::build(self.status_code()).finish()
            }
            _ => HttpResponse::build(self.status_code())
                .content_type("text/plain; charset=utf-8")
                .body(self.to_string()),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::ProtocolMismatch => StatusCode::BAD_REQUEST,
            GatewayError::MissingParameters => StatusCode::NOT_FOUND,
            GatewayError::Handshake(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room is closing")]
    Closing,

    #[error("Room unavailable")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "address in use");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::InternalError(_)));

        let config_err = config::ConfigError::NotFound(String::from("key not found"));
        let app_err: AppError = config_err.into();
        assert!(matches!(app_err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_error_status_codes() {
        let err = GatewayError::RouteNotFound("/nope".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = GatewayError::ProtocolMismatch;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = GatewayError::MissingParameters;
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = GatewayError::Handshake(HandshakeError::NoVersionHeader);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_not_found_responses_have_empty_body() {
        for err in [GatewayError::RouteNotFound("/nope".to_string()), GatewayError::MissingParameters] {
            let response = err.error_response();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
            assert!(body.is_empty());
        }

        let response = GatewayError::ProtocolMismatch.error_response();
        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(body, "websocket expected");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(GatewayError::ProtocolMismatch.to_string(), "websocket expected");

        assert_eq!(RoomError::Closing.to_string(), "Room is closing");
        assert_eq!(RoomError::Unavailable.to_string(), "Room unavailable");

        let err = AppError::ConfigError("bad port".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }
}
