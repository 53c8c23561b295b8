//! Wicket - chat-to-wallet session link gateway
//!
//! Chat commands cannot hold wallet secrets or drive a signing flow, so every
//! privileged action is split into two phases connected by an opaque,
//! single-use session token: the chat side creates a pending record and hands
//! the user a web link; the wallet web page completes the record once the
//! user signs. A background watcher observes completed transfers and pushes
//! direct messages back to the people involved.
//!
//! ## Components
//!
//! - **Store**: five session-link collections in MongoDB (or in memory for
//!   dev mode and tests)
//! - **Resolver**: most recent valid wallet address per chat user, skipping
//!   placeholder records
//! - **Links**: session-link lifecycle, creation through completion
//! - **History**: paged transfer history with resolved counterparts
//! - **Notifier**: standing watcher over SendLink updates
//! - **Chat / Server**: interaction handling and the HTTP surface

pub mod chat;
pub mod config;
pub mod db;
pub mod history;
pub mod links;
pub mod network;
pub mod notifier;
pub mod resolver;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, WicketError};
