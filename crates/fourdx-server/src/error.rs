use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fourdx_core::error::{ErrorKind, FourdxError};

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

fn status_for(e: &FourdxError) -> StatusCode {
    match e {
        FourdxError::MemberExists(_) => StatusCode::CONFLICT,
        FourdxError::CommitmentCapReached { .. }
        | FourdxError::PastWeekLocked { .. }
        | FourdxError::InvalidSessionTransition { .. }
        | FourdxError::ConfirmationRequired(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FourdxError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => match e.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<FourdxError>() {
            Some(e) => status_for(e),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
