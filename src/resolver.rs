//! Address resolution
//!
//! A UserLink is created on `/connect` before the web side writes a real
//! address, so abandoned or concurrent connect attempts leave placeholder
//! rows interleaved with valid ones. The resolver walks strictly backward
//! through a user's time-ordered rows, skipping placeholders, until it finds
//! a valid address or the history runs out.
//!
//! The same walk serves every call site: the invoking user's own lookup,
//! recipient lookup for chat mentions, per-row counterpart display in the
//! history pages, and the notifier's inverse (address -> user) resolution.

use std::sync::Arc;

use crate::db::schemas::UserLinkDoc;
use crate::store::{LinkStore, UserLinkLookup};
use crate::types::Result;

/// Shown in place of a counterpart address that does not resolve
pub const UNRESOLVED_ADDRESS_DISPLAY: &str = "(unknown)";

pub struct AddressResolver {
    store: Arc<LinkStore>,
}

impl AddressResolver {
    pub fn new(store: Arc<LinkStore>) -> Self {
        Self { store }
    }

    /// Latest UserLink with a non-placeholder address for the lookup key,
    /// or None when no record exists or all records are placeholders
    async fn walk(&self, lookup: UserLinkLookup<'_>) -> Result<Option<UserLinkDoc>> {
        let mut cursor = None;
        loop {
            let Some(link) = self.store.latest_user_link(lookup, cursor).await? else {
                return Ok(None);
            };
            if !link.is_placeholder() {
                return Ok(Some(link));
            }
            cursor = Some(link.generate_time);
        }
    }

    /// Most recent valid wallet address for a chat user
    pub async fn resolve_address(&self, user: &str) -> Result<Option<String>> {
        Ok(self
            .walk(UserLinkLookup::ByUser(user))
            .await?
            .map(|link| link.address))
    }

    /// Most recent valid address formatted for display, with a placeholder
    /// substituted when the user does not resolve
    pub async fn resolve_address_display(&self, user: &str) -> Result<String> {
        Ok(self
            .resolve_address(user)
            .await?
            .unwrap_or_else(|| UNRESOLVED_ADDRESS_DISPLAY.to_string()))
    }

    /// Inverse direction: the chat user most recently holding an address
    pub async fn resolve_user_by_address(&self, address: &str) -> Result<Option<String>> {
        Ok(self
            .walk(UserLinkLookup::ByAddress(address))
            .await?
            .map(|link| link.user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::PLACEHOLDER_ADDRESS;
    use bson::DateTime;

    async fn seed(store: &LinkStore, user: &str, token: &str, address: &str, millis: i64) {
        let mut link = UserLinkDoc::new(user, token);
        link.address = address.to_string();
        link.generate_time = DateTime::from_millis(millis);
        store.insert_user_link(&link).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolves_most_recent_valid_address() {
        let store = Arc::new(LinkStore::memory());
        let resolver = AddressResolver::new(Arc::clone(&store));

        // t1 placeholder, t2 valid, t3 placeholder -> t2 wins
        seed(&store, "alice", "t1", PLACEHOLDER_ADDRESS, 1_000).await;
        seed(&store, "alice", "t2", "0xaddrA", 2_000).await;
        seed(&store, "alice", "t3", PLACEHOLDER_ADDRESS, 3_000).await;

        let address = resolver.resolve_address("alice").await.unwrap();
        assert_eq!(address.as_deref(), Some("0xaddrA"));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let store = Arc::new(LinkStore::memory());
        let resolver = AddressResolver::new(Arc::clone(&store));

        assert!(resolver.resolve_address("nobody").await.unwrap().is_none());
        assert_eq!(
            resolver.resolve_address_display("nobody").await.unwrap(),
            UNRESOLVED_ADDRESS_DISPLAY
        );
    }

    #[tokio::test]
    async fn test_all_placeholders_is_not_found() {
        let store = Arc::new(LinkStore::memory());
        let resolver = AddressResolver::new(Arc::clone(&store));

        seed(&store, "alice", "t1", PLACEHOLDER_ADDRESS, 1_000).await;
        seed(&store, "alice", "t2", PLACEHOLDER_ADDRESS, 2_000).await;

        assert!(resolver.resolve_address("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inverse_lookup_maps_address_to_user() {
        let store = Arc::new(LinkStore::memory());
        let resolver = AddressResolver::new(Arc::clone(&store));

        seed(&store, "alice", "t1", "0xshared", 1_000).await;
        seed(&store, "bob", "t2", "0xshared", 2_000).await;

        // Most recent holder wins
        let user = resolver.resolve_user_by_address("0xshared").await.unwrap();
        assert_eq!(user.as_deref(), Some("bob"));

        assert!(resolver
            .resolve_user_by_address("0xother")
            .await
            .unwrap()
            .is_none());
    }
}
