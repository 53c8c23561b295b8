//! CreateLink document schema
//!
//! A pending or completed vote-creation. `vote_id` holds the on-chain vote
//! identifier once the creating wallet signs; `finished` is flipped by tally
//! completion.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for create links
pub const CREATE_LINK_COLLECTION: &str = "create_links";

/// Bounds on the number of vote choices
pub const MIN_VOTE_OPTIONS: usize = 2;
pub const MAX_VOTE_OPTIONS: usize = 10;

/// CreateLink document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateLinkDoc {
    /// Stable record identifier (UUID v4)
    #[serde(rename = "_id")]
    pub id: String,

    /// Chat identity of the vote creator
    pub user: String,

    /// Single-use session token embedded in the create URL
    pub token: String,

    /// Vote topic shown in selection lists
    pub topic: String,

    /// Ordered choice strings, 2-10 entries, set once at creation
    pub options: Vec<String>,

    /// Chat channel the vote was created from
    pub channel_id: String,

    /// On-chain vote identifier; None until the create completion writes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_id: Option<String>,

    /// Set true by tally completion; None/false while the vote is open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<bool>,

    /// Creation timestamp, immutable
    pub generate_time: DateTime,
}

impl CreateLinkDoc {
    /// Create a pending vote-creation record
    pub fn new(user: &str, token: &str, topic: &str, options: Vec<String>, channel_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: user.to_string(),
            token: token.to_string(),
            topic: topic.to_string(),
            options,
            channel_id: channel_id.to_string(),
            vote_id: None,
            finished: None,
            generate_time: DateTime::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.vote_id.is_some()
    }

    /// Whether a tally has declared this vote finished
    pub fn is_finished(&self) -> bool {
        self.finished == Some(true)
    }
}

impl IntoIndexes for CreateLinkDoc {
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
