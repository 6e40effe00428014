//! API response envelope and error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pixel_core::{AccessDenial, GeometryError};
use serde::Serialize;
use tracing::error;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: None,
        }
    }

    /// Attach a machine readable error code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Handler result
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap a value in a successful response
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Error returned by handlers, rendered as an `ApiResponse` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: status_for_code(code),
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new("invalid_input", message)
    }
}

/// HTTP status for an error code
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "unauthorized" => StatusCode::UNAUTHORIZED,
        "project_not_found" | "user_not_found" | "session_not_found" => StatusCode::NOT_FOUND,
        "access_denied" => StatusCode::FORBIDDEN,
        "plan_limit" | "upgrade_required" => StatusCode::PAYMENT_REQUIRED,
        "invalid_input" | "unknown_tool" | "unknown_plan" => StatusCode::BAD_REQUEST,
        "upstream_error" | "network_error" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, error = %self.message, "Request failed");
        }
        let body = ApiResponse::<()>::error(self.message).with_code(self.code);
        (self.status, Json(body)).into_response()
    }
}

impl From<pixel_canvas::Error> for ApiError {
    fn from(err: pixel_canvas::Error) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<pixel_media::Error> for ApiError {
    fn from(err: pixel_media::Error) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<AccessDenial> for ApiError {
    fn from(err: AccessDenial) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<GeometryError> for ApiError {
    fn from(err: GeometryError) -> Self {
        Self::invalid_input(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_core::ToolId;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let err: ApiError = pixel_canvas::Error::ProjectNotFound(Uuid::nil()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: ApiError = pixel_canvas::Error::AccessDenied(Uuid::nil()).into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "access denied");

        let err: ApiError = AccessDenial::ProjectLimit { limit: 3 }.into();
        assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);

        let err: ApiError = AccessDenial::ProOnly(ToolId::AiExtender).into();
        assert_eq!(err.code, "upgrade_required");
        assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);

        let err: ApiError = pixel_canvas::Error::invalid_input("bad").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = pixel_canvas::Error::database("locked").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_envelope() {
        let response = ApiResponse::<()>::error("nope").with_code("access_denied");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "nope");
        assert_eq!(json["code"], "access_denied");
        assert!(json.get("data").is_none());
    }
}
