//! VoteLink document schema
//!
//! A single cast vote: the chosen option index plus a reference to the
//! CreateLink it belongs to.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for vote links
pub const VOTE_LINK_COLLECTION: &str = "vote_links";

/// VoteLink document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VoteLinkDoc {
    /// Stable record identifier (UUID v4)
    #[serde(rename = "_id")]
    pub id: String,

    /// Chat identity of the voter
    pub user: String,

    /// Single-use session token embedded in the vote URL
    pub token: String,

    /// Index into the referenced CreateLink's options
    pub choice: u32,

    /// Id of the CreateLink this vote belongs to
    pub create_id: String,

    /// On-chain transaction hash; None while pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// Creation timestamp, immutable
    pub generate_time: DateTime,
}

impl VoteLinkDoc {
    /// Create a pending vote record
    pub fn new(user: &str, token: &str, choice: u32, create_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: user.to_string(),
            token: token.to_string(),
            choice,
            create_id: create_id.to_string(),
            transaction_hash: None,
            network: None,
            generate_time: DateTime::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.transaction_hash.is_some()
    }
}

impl IntoIndexes for VoteLinkDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "token": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("token_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user": 1, "generate_time": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_generate_time".to_string())
                        .build(),
                ),
            ),
            // Per-vote tallying for result listings
            (
                doc! { "create_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("create_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
