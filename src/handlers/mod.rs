pub mod detection;
pub mod devices;
pub mod onts;
pub mod terminal;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::engine::EngineError;

/// Error response body: {"error": "message", "code": "..."}
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// API error type
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<&'static str>,
}

impl ApiError {
    fn with_status(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            code: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, format!("{} not found", resource))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Check for typed store errors first (no fragile string matching)
        if let Some(nf) = err.downcast_ref::<crate::db::NotFoundError>() {
            return Self {
                status: StatusCode::NOT_FOUND,
                message: nf.to_string(),
                code: Some("not_found"),
            };
        }
        if let Some(conflict) = err.downcast_ref::<crate::db::ConflictError>() {
            return Self::conflict(conflict.to_string());
        }
        Self::internal(err.to_string())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::MalformedList { .. }
            | EngineError::LengthMismatch { .. }
            | EngineError::InvalidAddress(_)
            | EngineError::DescriptionTooLong { .. }
            | EngineError::InvalidSerial(_)
            | EngineError::EmptyCommand => StatusCode::BAD_REQUEST,
            EngineError::OutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::DuplicateId { .. }
            | EngineError::PoolExhausted { .. }
            | EngineError::AlreadyRegistered { .. }
            | EngineError::Conflict(_)
            | EngineError::NotConnected(_) => StatusCode::CONFLICT,
            EngineError::NotFound { .. } | EngineError::NotDetected { .. } => StatusCode::NOT_FOUND,
            EngineError::Device(_) => StatusCode::BAD_GATEWAY,
            EngineError::Store(e) => {
                tracing::error!("Store error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: Some(err.code()),
            message: err.to_string(),
        }
    }
}

/// Message response for simple status messages
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Json<Self> {
        Json(Self { message: msg.into() })
    }
}

/// Response helper: return 201 Created with JSON body
pub fn created<T: Serialize>(item: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(item))
}

/// Healthcheck endpoint, returns 200 OK with status
pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ont-console",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TopologyAddress;

    #[test]
    fn test_engine_error_status_mapping() {
        let addr = TopologyAddress::new(0, 1, 3);
        let cases: Vec<(EngineError, StatusCode)> = vec![
            (EngineError::LengthMismatch { gem_ports: 2, vlans: 1 }, StatusCode::BAD_REQUEST),
            (EngineError::EmptyCommand, StatusCode::BAD_REQUEST),
            (EngineError::OutOfRange { ont_id: 128, ceiling: 127 }, StatusCode::UNPROCESSABLE_ENTITY),
            (EngineError::DuplicateId { ont_id: 3, address: addr }, StatusCode::CONFLICT),
            (EngineError::PoolExhausted { address: addr, ceiling: 63 }, StatusCode::CONFLICT),
            (EngineError::AlreadyRegistered { serial: "HWTC0001".into() }, StatusCode::CONFLICT),
            (EngineError::not_found("Device", "x"), StatusCode::NOT_FOUND),
            (EngineError::Device("timeout".into()), StatusCode::BAD_GATEWAY),
            (EngineError::Store(anyhow::anyhow!("disk full")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_store_errors_downcast() {
        let nf: anyhow::Error = crate::db::NotFoundError::new("ONT", "abc").into();
        let err = ApiError::from(nf);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "ONT not found: abc");
        assert_eq!(err.code, Some("not_found"));
        let conflict: anyhow::Error = crate::db::ConflictError::new("dup").into();
        assert_eq!(ApiError::from(conflict).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(anyhow::anyhow!("boom")).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
