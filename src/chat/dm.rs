//! Direct-message delivery
//!
//! The change notifier pushes notifications through this seam. Delivery is
//! best-effort: callers log failures and never retry or roll back record
//! state.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::types::{Result, WicketError};

#[async_trait]
pub trait DirectMessenger: Send + Sync {
    /// Send a direct message to one chat user
    async fn send_dm(&self, user_id: &str, content: &str) -> Result<()>;
}

/// REST messenger against the chat platform's HTTP API: opens (or reuses)
/// the user's DM channel, then posts the message into it
pub struct RestMessenger {
    http: reqwest::Client,
    api_url: String,
    bot_token: String,
}

#[derive(Deserialize)]
struct DmChannel {
    id: String,
}

impl RestMessenger {
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }
}

#[async_trait]
impl DirectMessenger for RestMessenger {
    async fn send_dm(&self, user_id: &str, content: &str) -> Result<()> {
        let channel: DmChannel = self
            .http
            .post(format!("{}/users/@me/channels", self.api_url))
            .header("Authorization", self.auth_header())
            .json(&json!({ "recipient_id": user_id }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| WicketError::Delivery(format!("DM channel open failed: {}", e)))?
            .json()
            .await?;

        self.http
            .post(format!("{}/channels/{}/messages", self.api_url, channel.id))
            .header("Authorization", self.auth_header())
            .json(&json!({ "content": content }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| WicketError::Delivery(format!("DM send failed: {}", e)))?;

        Ok(())
    }
}

/// Dev-mode messenger: logs instead of delivering
pub struct LogMessenger;

#[async_trait]
impl DirectMessenger for LogMessenger {
    async fn send_dm(&self, user_id: &str, content: &str) -> Result<()> {
        info!(user = %user_id, "DM (dev mode, not delivered): {}", content);
        Ok(())
    }
}
