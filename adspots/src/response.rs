use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use primitives::api::ErrorResponse;
use serde::Serialize;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    BadRequest(ErrorResponse),
    NotFound(ErrorResponse),
    Internal(ErrorResponse),
    TooManyRequests(ErrorResponse),
}

impl ResponseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResponseError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ResponseError::NotFound(_) => StatusCode::NOT_FOUND,
            ResponseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResponseError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn error_response(&self) -> &ErrorResponse {
        match self {
            ResponseError::BadRequest(error)
            | ResponseError::NotFound(error)
            | ResponseError::Internal(error)
            | ResponseError::TooManyRequests(error) => error,
        }
    }
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        json_response(status_code, self.error_response())
    }
}

/// A successful (`200 OK`) JSON response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        json_response(StatusCode::OK, &self.0)
    }
}

/// Serializes `body` and sets the `Content-Type` with the charset.
pub fn json_response<T: Serialize + ?Sized>(status_code: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = (status_code, bytes).into_response();
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serialize the response: {err}"),
        )
            .into_response(),
    }
}
