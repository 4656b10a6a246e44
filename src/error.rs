use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised by frame sources.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("Insufficient permissions to capture (try running as root)")]
    InsufficientPermissions,

    #[error("Failed to create capture channel: {0}")]
    ChannelCreation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PCAP parse error ({context}): {message}")]
    Pcap {
        context: &'static str,
        message: String,
    },

    #[error("Capture read error: {0}")]
    Read(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Error opening pcap file: {0}")]
    CaptureOpen(CaptureError),

    #[error("Error reading pcap file: {0}")]
    CaptureRead(CaptureError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Bodies stay terse; the detailed cause goes to the log only.
        let (status, message) = match &self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error storing upload".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::CaptureOpen(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error opening pcap file".to_string(),
            ),
            AppError::CaptureRead(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error reading pcap file".to_string(),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        tracing::error!("{}: {}", status, self);
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_maps_to_400() {
        let response = AppError::BadRequest("Error retrieving file".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_capture_open_maps_to_500() {
        let err = CaptureError::Pcap {
            context: "pcap reader init",
            message: "header not recognized".to_string(),
        };
        let response = AppError::CaptureOpen(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        let response = AppError::Forbidden("origin".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::InterfaceNotFound("eth9".to_string());
        assert_eq!(err.to_string(), "Interface not found: eth9");
    }
}
