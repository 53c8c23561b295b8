//! Transaction history pagination
//!
//! Serves paged, newest-first transfer history for one chat user in either
//! role. One extra record is fetched per page to detect whether a next page
//! exists without a separate count query.

use std::sync::Arc;

use bson::DateTime;

use crate::resolver::AddressResolver;
use crate::store::{HistoryFilter, LinkStore};
use crate::types::{Result, WicketError};

/// Records per page
pub const PAGE_SIZE: usize = 10;

/// Which side of a transfer the history is viewed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    Sender,
    Receiver,
}

impl HistoryRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sender" => Some(Self::Sender),
            "receiver" => Some(Self::Receiver),
            _ => None,
        }
    }
}

/// One completed transfer as shown on a history page
#[derive(Debug, Clone)]
pub struct HistoryItem {
    pub amount: f64,
    /// The other side of the transfer: recipient address on a sender-role
    /// page, resolved sender address on a receiver-role page
    pub counterpart_address: String,
    pub transaction_hash: String,
    pub network: Option<String>,
    pub generate_time: DateTime,
}

/// One page of history, 1-based
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub page: u32,
    pub items: Vec<HistoryItem>,
    pub has_next: bool,
}

impl HistoryPage {
    /// "Previous" is never offered below page 1
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

pub struct HistoryEngine {
    store: Arc<LinkStore>,
    resolver: Arc<AddressResolver>,
}

impl HistoryEngine {
    pub fn new(store: Arc<LinkStore>, resolver: Arc<AddressResolver>) -> Self {
        Self { store, resolver }
    }

    /// One page of completed transfers for `user` in the given role.
    ///
    /// Receiver-role pages are keyed on the user's resolved address and fail
    /// with `NotFound` when no address is connected. Counterpart resolution
    /// per row tolerates unknown users by substituting a display placeholder.
    pub async fn page(&self, user: &str, role: HistoryRole, page: u32) -> Result<HistoryPage> {
        if page == 0 {
            return Err(WicketError::InvalidInput("pages are 1-based".to_string()));
        }

        let own_address;
        let filter = match role {
            HistoryRole::Sender => HistoryFilter::Sender(user),
            HistoryRole::Receiver => {
                own_address = self
                    .resolver
                    .resolve_address(user)
                    .await?
                    .ok_or_else(|| WicketError::NotFound("no address connected".to_string()))?;
                HistoryFilter::Receiver(&own_address)
            }
        };

        let skip = (page as u64 - 1) * PAGE_SIZE as u64;
        // One extra record tells us whether a next page exists
        let mut fetched = self
            .store
            .send_link_history(filter, skip, PAGE_SIZE as i64 + 1)
            .await?;
        let has_next = fetched.len() > PAGE_SIZE;
        fetched.truncate(PAGE_SIZE);

        let mut items = Vec::with_capacity(fetched.len());
        for record in fetched {
            let counterpart_address = match role {
                // The record already carries the recipient address
                HistoryRole::Sender => record.to_address.clone(),
                // The sender is a chat user; walk their address history
                HistoryRole::Receiver => {
                    self.resolver.resolve_address_display(&record.user).await?
                }
            };
            items.push(HistoryItem {
                amount: record.amount,
                counterpart_address,
                transaction_hash: record.transaction_hash.unwrap_or_default(),
                network: record.network,
                generate_time: record.generate_time,
            });
        }

        Ok(HistoryPage { page, items, has_next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{SendLinkDoc, UserLinkDoc};
    use crate::resolver::UNRESOLVED_ADDRESS_DISPLAY;

    fn engine() -> (Arc<LinkStore>, HistoryEngine) {
        let store = Arc::new(LinkStore::memory());
        let resolver = Arc::new(AddressResolver::new(Arc::clone(&store)));
        let engine = HistoryEngine::new(Arc::clone(&store), resolver);
        (store, engine)
    }

    async fn seed_transfer(store: &LinkStore, user: &str, n: i64, to: &str) {
        let token = format!("tok{}", n);
        let mut link = SendLinkDoc::new(user, &token, to, n as f64);
        link.generate_time = DateTime::from_millis(n * 1_000);
        store.insert_send_link(&link).await.unwrap();
        store
            .complete_send_link(&token, &format!("hash{}", n), "Testnet")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_eleven_records_fill_one_page_with_next() {
        let (store, engine) = engine();
        for n in 1..=11 {
            seed_transfer(&store, "alice", n, "0xdest").await;
        }

        let page = engine.page("alice", HistoryRole::Sender, 1).await.unwrap();
        assert_eq!(page.items.len(), PAGE_SIZE);
        assert!(page.has_next);
        assert!(!page.has_previous());

        // Newest first: the extra record is the oldest one
        assert_eq!(page.items[0].transaction_hash, "hash11");

        let page2 = engine.page("alice", HistoryRole::Sender, 2).await.unwrap();
        assert_eq!(page2.items.len(), 1);
        assert!(!page2.has_next);
        assert!(page2.has_previous());
    }

    #[tokio::test]
    async fn test_exactly_ten_records_have_no_next_page() {
        let (store, engine) = engine();
        for n in 1..=10 {
            seed_transfer(&store, "alice", n, "0xdest").await;
        }

        let page = engine.page("alice", HistoryRole::Sender, 1).await.unwrap();
        assert_eq!(page.items.len(), PAGE_SIZE);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn test_receiver_role_requires_connected_address() {
        let (_, engine) = engine();
        let err = engine
            .page("alice", HistoryRole::Receiver, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, WicketError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_receiver_page_resolves_counterpart_with_fallback() {
        let (store, engine) = engine();

        // Receiver alice owns 0xdest
        let mut own = UserLinkDoc::new("alice", "ul1");
        own.address = "0xdest".to_string();
        own.generate_time = DateTime::from_millis(100);
        store.insert_user_link(&own).await.unwrap();

        // Sender bob has a connected address, sender mallory does not
        let mut bob = UserLinkDoc::new("bob", "ul2");
        bob.address = "0xbob".to_string();
        bob.generate_time = DateTime::from_millis(200);
        store.insert_user_link(&bob).await.unwrap();

        seed_transfer(&store, "bob", 1, "0xdest").await;
        seed_transfer(&store, "mallory", 2, "0xdest").await;

        let page = engine.page("alice", HistoryRole::Receiver, 1).await.unwrap();
        assert_eq!(page.items.len(), 2);
        // Newest first: mallory's transfer, unresolvable sender
        assert_eq!(page.items[0].counterpart_address, UNRESOLVED_ADDRESS_DISPLAY);
        assert_eq!(page.items[1].counterpart_address, "0xbob");
    }

    #[tokio::test]
    async fn test_page_zero_is_rejected() {
        let (_, engine) = engine();
        let err = engine.page("alice", HistoryRole::Sender, 0).await.unwrap_err();
        assert!(matches!(err, WicketError::InvalidInput(_)));
    }
}
