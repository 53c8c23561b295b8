//! Record store for the five session-link collections
//!
//! `LinkStore` is the single facade the rest of the service talks to. It
//! dispatches to one of two backends:
//!
//! - **Mongo** - typed collections with indexes applied at startup and a
//!   change stream feeding the notifier
//! - **Memory** - vectors behind locks with a broadcast channel standing in
//!   for the change stream; used in dev mode and by tests
//!
//! The store only offers the simple queries the service needs: insert with
//! duplicate-token detection, find-by-token/id, latest-matching-before-cursor
//! for the address resolver, filtered listings, paged history, and the
//! field-setting completion writes.

mod memory;
mod mongo;

use bson::DateTime;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tracing::warn;

use crate::db::schemas::{CreateLinkDoc, SendLinkDoc, TallyLinkDoc, UserLinkDoc, VoteLinkDoc};
use crate::db::{InsertOutcome, MongoClient};
use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Lookup key for the address resolver's walk
#[derive(Debug, Clone, Copy)]
pub enum UserLinkLookup<'a> {
    /// Resolve a chat user's address history
    ByUser(&'a str),
    /// Inverse direction: find the user holding an address
    ByAddress(&'a str),
}

/// History page filter, one variant per role
#[derive(Debug, Clone, Copy)]
pub enum HistoryFilter<'a> {
    /// Transfers sent by this chat user
    Sender(&'a str),
    /// Transfers received at this resolved address
    Receiver(&'a str),
}

/// Filter for CreateLink selection listings
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteListFilter<'a> {
    /// Drop records a tally has explicitly finished
    pub exclude_finished: bool,
    /// Restrict to records created by this user
    pub creator: Option<&'a str>,
}

enum Backend {
    Mongo(MongoStore),
    Memory(MemoryStore),
}

/// Stream of SendLink update events, one record id per completed transfer
pub struct SendLinkEvents(EventsInner);

enum EventsInner {
    Mongo(mongodb::change_stream::ChangeStream<mongodb::change_stream::event::ChangeStreamEvent<SendLinkDoc>>),
    Memory(broadcast::Receiver<String>),
}

impl SendLinkEvents {
    /// Next updated record id, or None when the stream is closed.
    ///
    /// Event payloads carry only the changed fields; callers reload the full
    /// record by id.
    pub async fn next_updated_id(&mut self) -> Option<String> {
        match &mut self.0 {
            EventsInner::Mongo(stream) => loop {
                match stream.next().await? {
                    Ok(event) => {
                        let id = event
                            .document_key
                            .as_ref()
                            .and_then(|key| key.get_str("_id").ok())
                            .map(ToString::to_string);
                        match id {
                            Some(id) => return Some(id),
                            None => warn!("Change event without a document key, skipping"),
                        }
                    }
                    Err(e) => {
                        warn!("Change stream error, skipping event: {}", e);
                    }
                }
            },
            EventsInner::Memory(rx) => loop {
                match rx.recv().await {
                    Ok(id) => return Some(id),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Update events lagged, {} events dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
        }
    }
}

/// Facade over the two store backends
pub struct LinkStore {
    backend: Backend,
}

impl LinkStore {
    /// MongoDB-backed store; opens collections and applies indexes
    pub async fn mongo(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            backend: Backend::Mongo(MongoStore::new(client).await?),
        })
    }

    /// In-memory store for dev mode and tests
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::new()),
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }

    // --- UserLink ---

    pub async fn insert_user_link(&self, link: &UserLinkDoc) -> Result<InsertOutcome> {
        match &self.backend {
            Backend::Mongo(s) => s.insert_user_link(link).await,
            Backend::Memory(s) => s.insert_user_link(link),
        }
    }

    pub async fn user_link_by_token(&self, token: &str) -> Result<Option<UserLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.user_link_by_token(token).await,
            Backend::Memory(s) => s.user_link_by_token(token),
        }
    }

    /// Latest UserLink matching the lookup key, optionally restricted to
    /// records strictly older than `before`. This is the single query the
    /// resolver's backward walk is built on.
    pub async fn latest_user_link(
        &self,
        lookup: UserLinkLookup<'_>,
        before: Option<DateTime>,
    ) -> Result<Option<UserLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.latest_user_link(lookup, before).await,
            Backend::Memory(s) => s.latest_user_link(lookup, before),
        }
    }

    pub async fn set_user_link_address(&self, token: &str, address: &str) -> Result<()> {
        match &self.backend {
            Backend::Mongo(s) => s.set_user_link_address(token, address).await,
            Backend::Memory(s) => s.set_user_link_address(token, address),
        }
    }

    // --- SendLink ---

    pub async fn insert_send_link(&self, link: &SendLinkDoc) -> Result<InsertOutcome> {
        match &self.backend {
            Backend::Mongo(s) => s.insert_send_link(link).await,
            Backend::Memory(s) => s.insert_send_link(link),
        }
    }

    pub async fn send_link_by_token(&self, token: &str) -> Result<Option<SendLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.send_link_by_token(token).await,
            Backend::Memory(s) => s.send_link_by_token(token),
        }
    }

    pub async fn send_link_by_id(&self, id: &str) -> Result<Option<SendLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.send_link_by_id(id).await,
            Backend::Memory(s) => s.send_link_by_id(id),
        }
    }

    pub async fn complete_send_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        match &self.backend {
            Backend::Mongo(s) => s.complete_send_link(token, hash, network).await,
            Backend::Memory(s) => s.complete_send_link(token, hash, network),
        }
    }

    pub async fn send_link_history(
        &self,
        filter: HistoryFilter<'_>,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<SendLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.send_link_history(filter, skip, limit).await,
            Backend::Memory(s) => s.send_link_history(filter, skip, limit),
        }
    }

    // --- CreateLink ---

    pub async fn insert_create_link(&self, link: &CreateLinkDoc) -> Result<InsertOutcome> {
        match &self.backend {
            Backend::Mongo(s) => s.insert_create_link(link).await,
            Backend::Memory(s) => s.insert_create_link(link),
        }
    }

    pub async fn create_link_by_token(&self, token: &str) -> Result<Option<CreateLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.create_link_by_token(token).await,
            Backend::Memory(s) => s.create_link_by_token(token),
        }
    }

    pub async fn create_link_by_id(&self, id: &str) -> Result<Option<CreateLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.create_link_by_id(id).await,
            Backend::Memory(s) => s.create_link_by_id(id),
        }
    }

    pub async fn list_create_links(&self, filter: VoteListFilter<'_>) -> Result<Vec<CreateLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.list_create_links(filter).await,
            Backend::Memory(s) => s.list_create_links(filter),
        }
    }

    pub async fn set_create_link_vote_id(&self, token: &str, vote_id: &str) -> Result<()> {
        match &self.backend {
            Backend::Mongo(s) => s.set_create_link_vote_id(token, vote_id).await,
            Backend::Memory(s) => s.set_create_link_vote_id(token, vote_id),
        }
    }

    pub async fn set_create_link_finished(&self, id: &str, finished: bool) -> Result<()> {
        match &self.backend {
            Backend::Mongo(s) => s.set_create_link_finished(id, finished).await,
            Backend::Memory(s) => s.set_create_link_finished(id, finished),
        }
    }

    // --- VoteLink ---

    pub async fn insert_vote_link(&self, link: &VoteLinkDoc) -> Result<InsertOutcome> {
        match &self.backend {
            Backend::Mongo(s) => s.insert_vote_link(link).await,
            Backend::Memory(s) => s.insert_vote_link(link),
        }
    }

    pub async fn vote_link_by_token(&self, token: &str) -> Result<Option<VoteLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.vote_link_by_token(token).await,
            Backend::Memory(s) => s.vote_link_by_token(token),
        }
    }

    pub async fn complete_vote_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        match &self.backend {
            Backend::Mongo(s) => s.complete_vote_link(token, hash, network).await,
            Backend::Memory(s) => s.complete_vote_link(token, hash, network),
        }
    }

    pub async fn vote_links_for(&self, create_id: &str) -> Result<Vec<VoteLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.vote_links_for(create_id).await,
            Backend::Memory(s) => s.vote_links_for(create_id),
        }
    }

    // --- TallyLink ---

    pub async fn insert_tally_link(&self, link: &TallyLinkDoc) -> Result<InsertOutcome> {
        match &self.backend {
            Backend::Mongo(s) => s.insert_tally_link(link).await,
            Backend::Memory(s) => s.insert_tally_link(link),
        }
    }

    pub async fn tally_link_by_token(&self, token: &str) -> Result<Option<TallyLinkDoc>> {
        match &self.backend {
            Backend::Mongo(s) => s.tally_link_by_token(token).await,
            Backend::Memory(s) => s.tally_link_by_token(token),
        }
    }

    pub async fn complete_tally_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        match &self.backend {
            Backend::Mongo(s) => s.complete_tally_link(token, hash, network).await,
            Backend::Memory(s) => s.complete_tally_link(token, hash, network),
        }
    }

    // --- Change events ---

    /// Subscribe to SendLink update events for the change notifier
    pub async fn subscribe_send_link_updates(&self) -> Result<SendLinkEvents> {
        match &self.backend {
            Backend::Mongo(s) => Ok(SendLinkEvents(EventsInner::Mongo(s.watch_send_links().await?))),
            Backend::Memory(s) => Ok(SendLinkEvents(EventsInner::Memory(s.subscribe_send_updates()))),
        }
    }
}
