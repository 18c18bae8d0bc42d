use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::ApiResponse;
use crate::validation::FieldError;

#[derive(Serialize)]
struct FieldErrors {
    errors: Vec<FieldError>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::OwnerRequired => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::PasswordIncorrect => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::TaskNotFound => StatusCode::NOT_FOUND,
            AppError::UsernameTaken(_) => StatusCode::CONFLICT,
            AppError::Redis(_)
            | AppError::Serialization(_)
            | AppError::Hashing(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// The IntoResponse trait implementation converts AppError into the JSON envelope.
// Internal details are logged here and never sent to the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = self.code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let data = match self {
            AppError::Validation(errors) => serde_json::to_value(FieldErrors { errors }).ok(),
            _ => None,
        };

        let body: ApiResponse<Value> = ApiResponse {
            status: code,
            error: message.to_string(),
            data,
        };
        (status, Json(body)).into_response()
    }
}

// Malformed bodies surface as validation errors rather than axum's plain-text rejections.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldError {
            field: "body".into(),
            value: Value::Null,
            message: rejection.body_text(),
        }])
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(vec![FieldError {
            field: "query".into(),
            value: Value::Null,
            message: rejection.body_text(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TokenError;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_403_with_code() {
        let response = AppError::forbidden("not the owner").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let json = body_json(response).await;
        assert_eq!(json["status"], 2003);
        assert_eq!(json["error"], "Unauthorized");
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_internal_detail_is_not_leaked() {
        let response = AppError::Internal("connection refused at 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["status"], 500);
        assert!(!json.to_string().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_token_failures_collapse_to_unauthenticated() {
        for err in [TokenError::Expired, TokenError::BadSignature, TokenError::Missing] {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(body_json(response).await["status"], 2001);
        }
    }

    #[tokio::test]
    async fn test_validation_lists_field_errors() {
        let err = AppError::Validation(vec![FieldError {
            field: "title".into(),
            value: Value::Null,
            message: "Title must not be blank".into(),
        }]);
        let json = body_json(err.into_response()).await;

        assert_eq!(json["status"], 400);
        assert_eq!(json["data"]["errors"][0]["field"], "title");
    }
}
