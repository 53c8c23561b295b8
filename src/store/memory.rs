//! In-memory backend for the link store
//!
//! Used in dev mode when MongoDB is unreachable and by the test suite. Each
//! collection is a vector behind a lock; a broadcast channel stands in for
//! the MongoDB change stream so the notifier sees the same update events.

use std::sync::RwLock;

use bson::DateTime;
use tokio::sync::broadcast;

use crate::db::schemas::{CreateLinkDoc, SendLinkDoc, TallyLinkDoc, UserLinkDoc, VoteLinkDoc};
use crate::db::InsertOutcome;
use crate::store::{HistoryFilter, UserLinkLookup, VoteListFilter};
use crate::types::{Result, WicketError};

/// Capacity of the update broadcast channel; the notifier drains events
/// promptly, lagged receivers just skip ahead
const UPDATE_CHANNEL_CAPACITY: usize = 256;

pub struct MemoryStore {
    user_links: RwLock<Vec<UserLinkDoc>>,
    send_links: RwLock<Vec<SendLinkDoc>>,
    create_links: RwLock<Vec<CreateLinkDoc>>,
    vote_links: RwLock<Vec<VoteLinkDoc>>,
    tally_links: RwLock<Vec<TallyLinkDoc>>,
    send_updates: broadcast::Sender<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (send_updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            user_links: RwLock::new(Vec::new()),
            send_links: RwLock::new(Vec::new()),
            create_links: RwLock::new(Vec::new()),
            vote_links: RwLock::new(Vec::new()),
            tally_links: RwLock::new(Vec::new()),
            send_updates,
        }
    }

    fn lock_poisoned() -> WicketError {
        WicketError::Database("memory store lock poisoned".to_string())
    }

    // --- UserLink ---

    pub fn insert_user_link(&self, link: &UserLinkDoc) -> Result<InsertOutcome> {
        let mut table = self.user_links.write().map_err(|_| Self::lock_poisoned())?;
        if table.iter().any(|l| l.token == link.token) {
            return Ok(InsertOutcome::DuplicateKey);
        }
        table.push(link.clone());
        Ok(InsertOutcome::Inserted)
    }

    pub fn user_link_by_token(&self, token: &str) -> Result<Option<UserLinkDoc>> {
        let table = self.user_links.read().map_err(|_| Self::lock_poisoned())?;
        Ok(table.iter().find(|l| l.token == token).cloned())
    }

    pub fn latest_user_link(
        &self,
        lookup: UserLinkLookup<'_>,
        before: Option<DateTime>,
    ) -> Result<Option<UserLinkDoc>> {
        let table = self.user_links.read().map_err(|_| Self::lock_poisoned())?;
        let latest = table
            .iter()
            .filter(|l| match lookup {
                UserLinkLookup::ByUser(user) => l.user == user,
                UserLinkLookup::ByAddress(address) => l.address == address,
            })
            .filter(|l| before.is_none_or(|cursor| l.generate_time < cursor))
            .max_by_key(|l| l.generate_time);
        Ok(latest.cloned())
    }

    pub fn set_user_link_address(&self, token: &str, address: &str) -> Result<()> {
        let mut table = self.user_links.write().map_err(|_| Self::lock_poisoned())?;
        if let Some(link) = table.iter_mut().find(|l| l.token == token) {
            link.address = address.to_string();
        }
        Ok(())
    }

    // --- SendLink ---

    pub fn insert_send_link(&self, link: &SendLinkDoc) -> Result<InsertOutcome> {
        let mut table = self.send_links.write().map_err(|_| Self::lock_poisoned())?;
        if table.iter().any(|l| l.token == link.token) {
            return Ok(InsertOutcome::DuplicateKey);
        }
        table.push(link.clone());
        Ok(InsertOutcome::Inserted)
    }

    pub fn send_link_by_token(&self, token: &str) -> Result<Option<SendLinkDoc>> {
        let table = self.send_links.read().map_err(|_| Self::lock_poisoned())?;
        Ok(table.iter().find(|l| l.token == token).cloned())
    }

    pub fn send_link_by_id(&self, id: &str) -> Result<Option<SendLinkDoc>> {
        let table = self.send_links.read().map_err(|_| Self::lock_poisoned())?;
        Ok(table.iter().find(|l| l.id == id).cloned())
    }

    pub fn complete_send_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        let id = {
            let mut table = self.send_links.write().map_err(|_| Self::lock_poisoned())?;
            match table.iter_mut().find(|l| l.token == token) {
                Some(link) => {
                    link.transaction_hash = Some(hash.to_string());
                    link.network = Some(network.to_string());
                    Some(link.id.clone())
                }
                None => None,
            }
        };
        // Mirror the MongoDB change stream: one update event per write
        if let Some(id) = id {
            let _ = self.send_updates.send(id);
        }
        Ok(())
    }

    pub fn send_link_history(
        &self,
        filter: HistoryFilter<'_>,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<SendLinkDoc>> {
        let table = self.send_links.read().map_err(|_| Self::lock_poisoned())?;
        let mut matching: Vec<SendLinkDoc> = table
            .iter()
            .filter(|l| l.transaction_hash.is_some())
            .filter(|l| match filter {
                HistoryFilter::Sender(user) => l.user == user,
                HistoryFilter::Receiver(address) => l.to_address == address,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.generate_time.cmp(&a.generate_time));

        let page: Vec<SendLinkDoc> = matching
            .into_iter()
            .skip(skip as usize)
            .take(if limit > 0 { limit as usize } else { usize::MAX })
            .collect();
        Ok(page)
    }

    // --- CreateLink ---

    pub fn insert_create_link(&self, link: &CreateLinkDoc) -> Result<InsertOutcome> {
        let mut table = self.create_links.write().map_err(|_| Self::lock_poisoned())?;
        if table.iter().any(|l| l.token == link.token) {
            return Ok(InsertOutcome::DuplicateKey);
        }
        table.push(link.clone());
        Ok(InsertOutcome::Inserted)
    }

    pub fn create_link_by_token(&self, token: &str) -> Result<Option<CreateLinkDoc>> {
        let table = self.create_links.read().map_err(|_| Self::lock_poisoned())?;
        Ok(table.iter().find(|l| l.token == token).cloned())
    }

    pub fn create_link_by_id(&self, id: &str) -> Result<Option<CreateLinkDoc>> {
        let table = self.create_links.read().map_err(|_| Self::lock_poisoned())?;
        Ok(table.iter().find(|l| l.id == id).cloned())
    }

    pub fn list_create_links(&self, filter: VoteListFilter<'_>) -> Result<Vec<CreateLinkDoc>> {
        let table = self.create_links.read().map_err(|_| Self::lock_poisoned())?;
        let mut matching: Vec<CreateLinkDoc> = table
            .iter()
            .filter(|l| !(filter.exclude_finished && l.is_finished()))
            .filter(|l| filter.creator.is_none_or(|creator| l.user == creator))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.generate_time.cmp(&a.generate_time));
        Ok(matching)
    }

    pub fn set_create_link_vote_id(&self, token: &str, vote_id: &str) -> Result<()> {
        let mut table = self.create_links.write().map_err(|_| Self::lock_poisoned())?;
        if let Some(link) = table.iter_mut().find(|l| l.token == token) {
            link.vote_id = Some(vote_id.to_string());
        }
        Ok(())
    }

    pub fn set_create_link_finished(&self, id: &str, finished: bool) -> Result<()> {
        let mut table = self.create_links.write().map_err(|_| Self::lock_poisoned())?;
        if let Some(link) = table.iter_mut().find(|l| l.id == id) {
            link.finished = Some(finished);
        }
        Ok(())
    }

    // --- VoteLink ---

    pub fn insert_vote_link(&self, link: &VoteLinkDoc) -> Result<InsertOutcome> {
        let mut table = self.vote_links.write().map_err(|_| Self::lock_poisoned())?;
        if table.iter().any(|l| l.token == link.token) {
            return Ok(InsertOutcome::DuplicateKey);
        }
        table.push(link.clone());
        Ok(InsertOutcome::Inserted)
    }

    pub fn vote_link_by_token(&self, token: &str) -> Result<Option<VoteLinkDoc>> {
        let table = self.vote_links.read().map_err(|_| Self::lock_poisoned())?;
        Ok(table.iter().find(|l| l.token == token).cloned())
    }

    pub fn complete_vote_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        let mut table = self.vote_links.write().map_err(|_| Self::lock_poisoned())?;
        if let Some(link) = table.iter_mut().find(|l| l.token == token) {
            link.transaction_hash = Some(hash.to_string());
            link.network = Some(network.to_string());
        }
        Ok(())
    }

    pub fn vote_links_for(&self, create_id: &str) -> Result<Vec<VoteLinkDoc>> {
        let table = self.vote_links.read().map_err(|_| Self::lock_poisoned())?;
        Ok(table.iter().filter(|l| l.create_id == create_id).cloned().collect())
    }

    // --- TallyLink ---

    pub fn insert_tally_link(&self, link: &TallyLinkDoc) -> Result<InsertOutcome> {
        let mut table = self.tally_links.write().map_err(|_| Self::lock_poisoned())?;
        if table.iter().any(|l| l.token == link.token) {
            return Ok(InsertOutcome::DuplicateKey);
        }
        table.push(link.clone());
        Ok(InsertOutcome::Inserted)
    }

    pub fn tally_link_by_token(&self, token: &str) -> Result<Option<TallyLinkDoc>> {
        let table = self.tally_links.read().map_err(|_| Self::lock_poisoned())?;
        Ok(table.iter().find(|l| l.token == token).cloned())
    }

    pub fn complete_tally_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        let mut table = self.tally_links.write().map_err(|_| Self::lock_poisoned())?;
        if let Some(link) = table.iter_mut().find(|l| l.token == token) {
            link.transaction_hash = Some(hash.to_string());
            link.network = Some(network.to_string());
        }
        Ok(())
    }

    // --- Change events ---

    pub fn subscribe_send_updates(&self) -> broadcast::Receiver<String> {
        self.send_updates.subscribe()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
