//! HTTP route handlers

pub mod actions;
pub mod health;
pub mod interactions;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::types::WicketError;

/// Upper bound on accepted request bodies
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Error payload returned by every route
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Build a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_default()
}

/// Build a JSON error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorBody {
            error: message.to_string(),
        },
    )
}

/// Map a service error onto its HTTP shape
pub fn error_to_response(err: &WicketError) -> Response<Full<Bytes>> {
    error_response(err.status_code(), &err.to_string())
}

/// Read and deserialize a JSON request body
pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, WicketError> {
    let body = req
        .collect()
        .await
        .map_err(|e| WicketError::Http(format!("Failed to read body: {}", e)))?;
    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(WicketError::Http("Request body too large".into()));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| WicketError::BadRequest(format!("Invalid JSON body: {}", e)))
}
