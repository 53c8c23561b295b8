//! UserLink document schema
//!
//! Binds a chat user to a wallet address. A record is created with the
//! placeholder address when the user runs `/connect`; the web side writes the
//! real address exactly once when the wallet signs. Records are never updated
//! after that and never deleted, so a user's rows form an append-only address
//! history ordered by `generate_time`.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for user links
pub const USER_LINK_COLLECTION: &str = "user_links";

/// Address value a UserLink carries before the web side completes it
pub const PLACEHOLDER_ADDRESS: &str = "0x";

/// UserLink document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserLinkDoc {
    /// Stable record identifier (UUID v4)
    #[serde(rename = "_id")]
    pub id: String,

    /// Chat identity of the connecting user
    pub user: String,

    /// Single-use session token embedded in the connect URL
    pub token: String,

    /// Wallet address; placeholder until the completion call writes it
    pub address: String,

    /// Creation timestamp, immutable, orders the address history
    pub generate_time: DateTime,
}

impl UserLinkDoc {
    /// Create a pending user link with the placeholder address
    pub fn new(user: &str, token: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: user.to_string(),
            token: token.to_string(),
            address: PLACEHOLDER_ADDRESS.to_string(),
            generate_time: DateTime::now(),
        }
    }

    /// Whether the completion call has written a real address yet
    pub fn is_placeholder(&self) -> bool {
        self.address == PLACEHOLDER_ADDRESS
    }
}

impl IntoIndexes for UserLinkDoc {
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
            // Most-recent-first lookups by user
            (
                doc! { "user": 1, "generate_time": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_generate_time".to_string())
                        .build(),
                ),
            ),
            // Inverse lookup (address -> user) for the change notifier
            (
                doc! { "address": 1, "generate_time": -1 },
                Some(
                    IndexOptions::builder()
                        .name("address_generate_time".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
