//! TallyLink document schema
//!
//! A pending or completed "declare winner" action. Completion also sets the
//! referenced CreateLink's `finished` flag.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for tally links
pub const TALLY_LINK_COLLECTION: &str = "tally_links";

/// TallyLink document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TallyLinkDoc {
    /// Stable record identifier (UUID v4)
    #[serde(rename = "_id")]
    pub id: String,

    /// Chat identity of the tallying user (the vote creator)
    pub user: String,

    /// Single-use session token embedded in the tally URL
    pub token: String,

    /// Id of the CreateLink being tallied
    pub create_id: String,

    /// On-chain transaction hash; None while pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// Creation timestamp, immutable
    pub generate_time: DateTime,
}

impl TallyLinkDoc {
    /// Create a pending tally record
    pub fn new(user: &str, token: &str, create_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: user.to_string(),
            token: token.to_string(),
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

impl IntoIndexes for TallyLinkDoc {
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
        ]
    }
}
