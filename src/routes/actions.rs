//! Web-side action endpoints
//!
//! Uniform shape per action kind:
//! - `GET /api/<kind>?token=<link>` returns the pending record as the signing
//!   page's input data
//! - `POST /api/<kind>` with `{token, ...completion fields}` applies the
//!   completion and returns the updated record
//!
//! The wallet signing itself happens in the browser; these endpoints only
//! hand out and complete the session-link records.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{CreateLinkDoc, SendLinkDoc, TallyLinkDoc, UserLinkDoc, VoteLinkDoc};
use crate::links::LinkKind;
use crate::routes::{error_response, error_to_response, json_response, parse_json_body};
use crate::server::AppState;
use crate::types::{Result, WicketError};

fn rfc3339(time: bson::DateTime) -> String {
    time.to_chrono().to_rfc3339()
}

// --- Record views returned to the web pages ---

#[derive(Serialize)]
struct UserLinkView {
    token: String,
    user: String,
    address: String,
    generate_time: String,
}

impl From<UserLinkDoc> for UserLinkView {
    fn from(doc: UserLinkDoc) -> Self {
        Self {
            token: doc.token,
            user: doc.user,
            address: doc.address,
            generate_time: rfc3339(doc.generate_time),
        }
    }
}

#[derive(Serialize)]
struct SendLinkView {
    token: String,
    user: String,
    to_address: String,
    amount: f64,
    transaction_hash: Option<String>,
    network: Option<String>,
    generate_time: String,
}

impl From<SendLinkDoc> for SendLinkView {
    fn from(doc: SendLinkDoc) -> Self {
        Self {
            token: doc.token,
            user: doc.user,
            to_address: doc.to_address,
            amount: doc.amount,
            transaction_hash: doc.transaction_hash,
            network: doc.network,
            generate_time: rfc3339(doc.generate_time),
        }
    }
}

#[derive(Serialize)]
struct CreateLinkView {
    token: String,
    user: String,
    topic: String,
    options: Vec<String>,
    channel_id: String,
    vote_id: Option<String>,
    finished: Option<bool>,
    generate_time: String,
}

impl From<CreateLinkDoc> for CreateLinkView {
    fn from(doc: CreateLinkDoc) -> Self {
        Self {
            token: doc.token,
            user: doc.user,
            topic: doc.topic,
            options: doc.options,
            channel_id: doc.channel_id,
            vote_id: doc.vote_id,
            finished: doc.finished,
            generate_time: rfc3339(doc.generate_time),
        }
    }
}

/// Vote view joins in the referenced CreateLink's on-chain id and options so
/// the signing page needs no second request
#[derive(Serialize)]
struct VoteLinkView {
    token: String,
    user: String,
    choice: u32,
    create_id: String,
    vote_id: Option<String>,
    options: Vec<String>,
    transaction_hash: Option<String>,
    network: Option<String>,
    generate_time: String,
}

#[derive(Serialize)]
struct TallyLinkView {
    token: String,
    user: String,
    create_id: String,
    vote_id: Option<String>,
    topic: Option<String>,
    transaction_hash: Option<String>,
    network: Option<String>,
    generate_time: String,
}

// --- Completion request bodies ---

#[derive(Deserialize)]
struct ConnectCompletion {
    token: String,
    address: String,
}

#[derive(Deserialize)]
struct TransactionCompletion {
    token: String,
    transaction_hash: String,
    network: String,
}

#[derive(Deserialize)]
struct CreateCompletion {
    token: String,
    vote_id: String,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: String,
}

/// `GET /api/<kind>?token=<link>`
pub async fn handle_get(
    state: Arc<AppState>,
    kind: LinkKind,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let token = match query.and_then(|q| serde_urlencoded::from_str::<TokenQuery>(q).ok()) {
        Some(q) => q.token,
        None => return error_response(StatusCode::BAD_REQUEST, "missing token parameter"),
    };

    match fetch_record(&state, kind, &token).await {
        Ok(Some(body)) => json_response(StatusCode::OK, &body),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &format!("no {} link for that token", kind.as_str()),
        ),
        Err(e) => error_to_response(&e),
    }
}

async fn fetch_record(
    state: &AppState,
    kind: LinkKind,
    token: &str,
) -> Result<Option<serde_json::Value>> {
    let view = match kind {
        LinkKind::Connect => state
            .store
            .user_link_by_token(token)
            .await?
            .map(|doc| serde_json::to_value(UserLinkView::from(doc))),
        LinkKind::Send => state
            .store
            .send_link_by_token(token)
            .await?
            .map(|doc| serde_json::to_value(SendLinkView::from(doc))),
        LinkKind::Create => state
            .store
            .create_link_by_token(token)
            .await?
            .map(|doc| serde_json::to_value(CreateLinkView::from(doc))),
        LinkKind::Vote => match state.store.vote_link_by_token(token).await? {
            Some(doc) => {
                let create = state.store.create_link_by_id(&doc.create_id).await?;
                Some(serde_json::to_value(vote_view(doc, create)))
            }
            None => None,
        },
        LinkKind::Tally => match state.store.tally_link_by_token(token).await? {
            Some(doc) => {
                let create = state.store.create_link_by_id(&doc.create_id).await?;
                Some(serde_json::to_value(tally_view(doc, create)))
            }
            None => None,
        },
    };
    match view {
        Some(Ok(value)) => Ok(Some(value)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}

fn vote_view(doc: VoteLinkDoc, create: Option<CreateLinkDoc>) -> VoteLinkView {
    let (vote_id, options) = create
        .map(|c| (c.vote_id, c.options))
        .unwrap_or((None, Vec::new()));
    VoteLinkView {
        token: doc.token,
        user: doc.user,
        choice: doc.choice,
        create_id: doc.create_id,
        vote_id,
        options,
        transaction_hash: doc.transaction_hash,
        network: doc.network,
        generate_time: rfc3339(doc.generate_time),
    }
}

fn tally_view(doc: TallyLinkDoc, create: Option<CreateLinkDoc>) -> TallyLinkView {
    let (vote_id, topic) = create
        .map(|c| (c.vote_id, Some(c.topic)))
        .unwrap_or((None, None));
    TallyLinkView {
        token: doc.token,
        user: doc.user,
        create_id: doc.create_id,
        vote_id,
        topic,
        transaction_hash: doc.transaction_hash,
        network: doc.network,
        generate_time: rfc3339(doc.generate_time),
    }
}

/// `POST /api/<kind>` with `{token, ...completion fields}`
pub async fn handle_post(
    state: Arc<AppState>,
    kind: LinkKind,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let result = match kind {
        LinkKind::Connect => match parse_json_body::<ConnectCompletion>(req).await {
            Ok(body) => state
                .links
                .complete_user_link(&body.token, &body.address)
                .await
                .and_then(|doc| Ok(serde_json::to_value(UserLinkView::from(doc))?)),
            Err(e) => Err(e),
        },
        LinkKind::Send => match parse_json_body::<TransactionCompletion>(req).await {
            Ok(body) => state
                .links
                .complete_send_link(&body.token, &body.transaction_hash, &body.network)
                .await
                .and_then(|doc| Ok(serde_json::to_value(SendLinkView::from(doc))?)),
            Err(e) => Err(e),
        },
        LinkKind::Create => match parse_json_body::<CreateCompletion>(req).await {
            Ok(body) => state
                .links
                .complete_create_link(&body.token, &body.vote_id)
                .await
                .and_then(|doc| Ok(serde_json::to_value(CreateLinkView::from(doc))?)),
            Err(e) => Err(e),
        },
        LinkKind::Vote => match parse_json_body::<TransactionCompletion>(req).await {
            Ok(body) => {
                match state
                    .links
                    .complete_vote_link(&body.token, &body.transaction_hash, &body.network)
                    .await
                {
                    Ok(doc) => match state.store.create_link_by_id(&doc.create_id).await {
                        Ok(create) => {
                            serde_json::to_value(vote_view(doc, create)).map_err(WicketError::from)
                        }
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        },
        LinkKind::Tally => match parse_json_body::<TransactionCompletion>(req).await {
            Ok(body) => {
                match state
                    .links
                    .complete_tally_link(&body.token, &body.transaction_hash, &body.network)
                    .await
                {
                    Ok(doc) => match state.store.create_link_by_id(&doc.create_id).await {
                        Ok(create) => {
                            serde_json::to_value(tally_view(doc, create)).map_err(WicketError::from)
                        }
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(e) => error_to_response(&e),
    }
}
