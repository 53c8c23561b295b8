//! Chat interaction endpoint
//!
//! `POST /interactions` receives the platform's interaction payloads.
//! Request signature verification happens at the platform edge before
//! traffic reaches this service.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use crate::chat::Interaction;
use crate::routes::{error_to_response, json_response, parse_json_body};
use crate::server::AppState;

pub async fn handle(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let interaction: Interaction = match parse_json_body(req).await {
        Ok(payload) => payload,
        Err(e) => return error_to_response(&e),
    };

    let response = state.chat.handle(&interaction).await;
    json_response(StatusCode::OK, &response)
}
