use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use trustavo_store::{ErrorKind, StoreError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Missing or malformed x-trustavo-identity header")]
    MissingIdentity,

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Store(e) => match e.kind() {
                ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, e.to_string()),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
                ErrorKind::Expired | ErrorKind::SignalGone => (StatusCode::GONE, e.to_string()),
                // Never say whose it is.
                ErrorKind::NotOwner => {
                    (StatusCode::FORBIDDEN, "Operation not permitted".to_string())
                }
            },
            ServerError::MissingIdentity => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
