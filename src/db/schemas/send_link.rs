//! SendLink document schema
//!
//! A pending or completed transfer. `transaction_hash` is None exactly while
//! the transfer is pending; once the web side writes it the record is
//! immutable and the change notifier fires at most once for that transition.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for send links
pub const SEND_LINK_COLLECTION: &str = "send_links";

/// SendLink document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SendLinkDoc {
    /// Stable record identifier (UUID v4)
    #[serde(rename = "_id")]
    pub id: String,

    /// Chat identity of the sender
    pub user: String,

    /// Single-use session token embedded in the send URL
    pub token: String,

    /// Resolved recipient address
    pub to_address: String,

    /// Transfer amount
    pub amount: f64,

    /// On-chain transaction hash; None while pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,

    /// Network the transfer was submitted on; None while pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// Creation timestamp, immutable, orders transfer history
    pub generate_time: DateTime,
}

impl SendLinkDoc {
    /// Create a pending transfer record
    pub fn new(user: &str, token: &str, to_address: &str, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: user.to_string(),
            token: token.to_string(),
            to_address: to_address.to_string(),
            amount,
            transaction_hash: None,
            network: None,
            generate_time: DateTime::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.transaction_hash.is_some()
    }
}

impl IntoIndexes for SendLinkDoc {
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
            // Sender-role history pages
            (
                doc! { "user": 1, "generate_time": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_generate_time".to_string())
                        .build(),
                ),
            ),
            // Receiver-role history pages
            (
                doc! { "to_address": 1, "generate_time": -1 },
                Some(
                    IndexOptions::builder()
                        .name("to_address_generate_time".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
