//! HTTP helpers for webhook Lambda functions.

use lambda_http::{Body, Response};
use serde::Serialize;

use crate::Error;

/// Standard webhook response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Create a plain text response, used to echo subscription challenges.
pub fn text_response(status: u16, text: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Body::from(text.into()))?)
}

/// Create an error response whose status follows the error kind.
pub fn error_response(error: &Error) -> Result<Response<Body>, lambda_http::Error> {
    json_response(error.status_code(), &ApiResponse::<()>::error(error.to_string()))
}
