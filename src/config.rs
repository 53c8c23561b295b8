//! Configuration for Wicket
//!
//! CLI arguments and environment variable handling using clap.

use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use uuid::Uuid;

/// Wicket - chat-to-wallet session link gateway
///
/// Chat commands create pending wallet actions; the web side completes
/// them once the wallet signs.
#[derive(Parser, Debug, Clone)]
#[command(name = "wicket")]
#[command(about = "Chat-to-wallet session link gateway")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3001")]
    pub listen: SocketAddr,

    /// Public origin of the wallet web pages, used to build link URLs
    /// (e.g. "https://wallet.example.org")
    #[arg(long, env = "WEB_ORIGIN", default_value = "http://localhost:3000")]
    pub web_origin: String,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "wicket")]
    pub mongodb_db: String,

    /// Chat platform REST base URL for direct-message delivery
    #[arg(long, env = "CHAT_API_URL", default_value = "https://discord.com/api/v10")]
    pub chat_api_url: String,

    /// Chat platform bot token (required for notification delivery)
    #[arg(long, env = "CHAT_BOT_TOKEN")]
    pub chat_bot_token: Option<String>,

    /// Enable development mode (in-memory store when MongoDB is unreachable,
    /// notifications logged instead of delivered when no bot token is set)
    #[arg(long, env = "DEV_MODE", action = ArgAction::Set, default_value = "false")]
    pub dev_mode: bool,

    /// Enable the SendLink change notifier
    #[arg(long, env = "NOTIFIER_ENABLED", default_value = "true")]
    pub notifier_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.web_origin.is_empty() {
            return Err("WEB_ORIGIN must not be empty".to_string());
        }
        if !self.web_origin.starts_with("http://") && !self.web_origin.starts_with("https://") {
            return Err("WEB_ORIGIN must be an http(s) origin".to_string());
        }
        if !self.dev_mode && self.chat_bot_token.is_none() {
            return Err("CHAT_BOT_TOKEN is required in production mode".to_string());
        }
        Ok(())
    }

    /// Web origin without a trailing slash
    pub fn web_origin_trimmed(&self) -> &str {
        self.web_origin.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["wicket", "--dev-mode", "true"])
    }

    #[test]
    fn test_validate_rejects_bad_origin() {
        let mut args = base_args();
        args.web_origin = "wallet.example.org".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_requires_token_in_production() {
        let mut args = base_args();
        args.dev_mode = false;
        args.chat_bot_token = None;
        assert!(args.validate().is_err());

        args.chat_bot_token = Some("token".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_web_origin_trimmed() {
        let mut args = base_args();
        args.web_origin = "http://localhost:3000/".to_string();
        assert_eq!(args.web_origin_trimmed(), "http://localhost:3000");
    }
}
