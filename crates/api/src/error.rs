use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::api::ErrorResponse;

#[derive(Debug)]
pub enum AppError {
    /// Internal errors - logged but return generic 500 to user
    Internal(anyhow::Error),
    /// User-facing errors - message is safe to show
    External(StatusCode, &'static str),
    /// Validation errors - safe to show
    Validation(String),
}

impl AppError {
    pub fn unauthorized(message: &'static str) -> Self {
        Self::External(StatusCode::UNAUTHORIZED, message)
    }

    /// A request axum could not decode. Oversized bodies keep their 413, anything
    /// else malformed is a 400.
    pub fn rejected(status: StatusCode, detail: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::External(status, "request body too large")
        } else {
            Self::Validation(detail)
        }
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                sentry::capture_error(
                    err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static)
                );

                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::External(status, msg) => error_body(status, msg),
            AppError::Validation(msg) => error_body(StatusCode::BAD_REQUEST, msg),
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
pub(crate) async fn response_body(response: Response) -> String {
    use http_body_util::BodyExt;

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
