//! HTTP server implementation
//!
//! hyper http1 with TokioIo for async handling; one spawned task per
//! connection, routing by `(method, path)`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::chat::ChatHandler;
use crate::config::Args;
use crate::history::HistoryEngine;
use crate::links::{LinkKind, LinkService};
use crate::resolver::AddressResolver;
use crate::routes;
use crate::store::LinkStore;
use crate::types::WicketError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<LinkStore>,
    pub resolver: Arc<AddressResolver>,
    pub links: Arc<LinkService>,
    pub history: Arc<HistoryEngine>,
    pub chat: ChatHandler,
}

impl AppState {
    /// Wire the read/write services over one store
    pub fn new(args: Args, store: Arc<LinkStore>) -> Self {
        let resolver = Arc::new(AddressResolver::new(Arc::clone(&store)));
        let links = Arc::new(LinkService::new(Arc::clone(&store), &args.web_origin));
        let history = Arc::new(HistoryEngine::new(Arc::clone(&store), Arc::clone(&resolver)));
        let chat = ChatHandler::new(
            Arc::clone(&store),
            Arc::clone(&resolver),
            Arc::clone(&links),
            Arc::clone(&history),
        );
        Self {
            args,
            store,
            resolver,
            links,
            history,
            chat,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), WicketError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Wicket listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {}", method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health::health_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::health::version_info(),

        // CORS preflight for the wallet web pages
        (Method::OPTIONS, _) => preflight_response(),

        // Chat-platform interaction webhook
        (Method::POST, "/interactions") => {
            routes::interactions::handle(Arc::clone(&state), req).await
        }

        // Web-side action endpoints: /api/<kind>
        (Method::GET, p) if p.starts_with("/api/") => match parse_action_kind(p) {
            Some(kind) => {
                let query = req.uri().query().map(ToString::to_string);
                routes::actions::handle_get(Arc::clone(&state), kind, query.as_deref()).await
            }
            None => routes::error_response(StatusCode::NOT_FOUND, "unknown action"),
        },
        (Method::POST, p) if p.starts_with("/api/") => match parse_action_kind(p) {
            Some(kind) => routes::actions::handle_post(Arc::clone(&state), kind, req).await,
            None => routes::error_response(StatusCode::NOT_FOUND, "unknown action"),
        },

        _ => routes::error_response(StatusCode::NOT_FOUND, &format!("no route for {}", path)),
    };

    Ok(response)
}

/// Extract the action kind from an `/api/<kind>` path
fn parse_action_kind(path: &str) -> Option<LinkKind> {
    let rest = path.strip_prefix("/api/")?;
    let kind = rest.split('/').next()?;
    LinkKind::parse(kind)
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .body(Full::new(Bytes::new()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_parsing() {
        assert_eq!(parse_action_kind("/api/connect"), Some(LinkKind::Connect));
        assert_eq!(parse_action_kind("/api/send"), Some(LinkKind::Send));
        assert_eq!(parse_action_kind("/api/create"), Some(LinkKind::Create));
        assert_eq!(parse_action_kind("/api/vote"), Some(LinkKind::Vote));
        assert_eq!(parse_action_kind("/api/tally"), Some(LinkKind::Tally));
        assert_eq!(parse_action_kind("/api/unknown"), None);
        assert_eq!(parse_action_kind("/interactions"), None);
    }
}
