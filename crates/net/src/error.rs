//! Network and HTTP error types

use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use playzone_core::subscription::AccessDenial;
use serde_json::{json, Value};
use tracing::error;

/// Server result type
pub type Result<T> = std::result::Result<T, Error>;

/// Server startup and shutdown errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage error: {0}")]
    Core(#[from] playzone_core::Error),
}

/// Handler result type
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors returned to HTTP clients as `{ "message": ... }`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Subscription(AccessDenial),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::Subscription(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({ "message": self.to_string() });
        if let ApiError::Subscription(denial) = self {
            match *denial {
                AccessDenial::Upgrade => body["upgrade"] = json!(true),
                AccessDenial::Expired => body["expired"] = json!(true),
                AccessDenial::Inactive => body["inactive"] = json!(true),
                AccessDenial::OwnersOnly => {}
                AccessDenial::Feature { feature } => {
                    body["upgrade"] = json!(true);
                    body["requiredFeature"] = json!(feature.as_str());
                }
                AccessDenial::CenterLimit {
                    current,
                    max,
                    extra_center_price,
                } => {
                    body["upgrade"] = json!(true);
                    body["code"] = json!("CENTER_LIMIT");
                    body["currentCount"] = json!(current);
                    body["maxCount"] = json!(max);
                    body["extraCenterPrice"] = json!(extra_center_price);
                }
                AccessDenial::ImageLimit { max } => {
                    body["upgrade"] = json!(true);
                    body["maxImages"] = json!(max);
                }
            }
        }
        body
    }
}

impl From<playzone_core::Error> for ApiError {
    fn from(err: playzone_core::Error) -> Self {
        use playzone_core::Error as E;

        if err.is_constraint_violation() {
            return ApiError::Conflict("record already exists".into());
        }
        match err {
            E::Authentication(msg) => ApiError::Unauthorized(msg),
            E::PermissionDenied(msg) => ApiError::Forbidden(msg),
            E::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            E::Validation(msg) | E::InvalidOperation(msg) => ApiError::BadRequest(msg),
            E::Conflict(msg) => ApiError::Conflict(msg),
            e @ E::CapacityExceeded { .. } => ApiError::Conflict(e.to_string()),
            E::Subscription(denial) => ApiError::Subscription(denial),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(%detail, "Request failed");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playzone_core::subscription::OwnerFeature;

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = playzone_core::Error::NotFound("center 1".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = playzone_core::Error::InvalidOperation("bad move".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = playzone_core::Error::CapacityExceeded {
            seat_type: "vip".into(),
            available: 0,
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_center_limit_body() {
        let err = ApiError::Subscription(AccessDenial::CenterLimit {
            current: 1,
            max: 1,
            extra_center_price: 19_900,
        });
        let body = err.body();
        assert_eq!(body["code"], "CENTER_LIMIT");
        assert_eq!(body["maxCount"], 1);
        assert_eq!(body["upgrade"], true);
    }

    #[test]
    fn test_feature_body() {
        let body = ApiError::Subscription(AccessDenial::Feature {
            feature: OwnerFeature::Video,
        })
        .body();
        assert_eq!(body["requiredFeature"], "video");
    }

    #[test]
    fn test_internal_hides_detail() {
        let err = ApiError::Internal("disk on fire".into());
        assert_eq!(err.body()["message"], "Internal server error");
    }
}
