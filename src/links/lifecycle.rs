//! Session-link lifecycle
//!
//! Every privileged action is split into two phases: the chat side creates a
//! pending record here and hands the user a URL containing the link token;
//! the web side later calls the matching completion. Completion is
//! idempotent-rejecting: a second attempt for the same token fails with
//! `AlreadyCompleted` rather than merging, so the change notifier fires at
//! most once per record.
//!
//! The duplicate-completion guard is an existence check, not an atomic
//! compare-and-set; two near-simultaneous completions for one token are not
//! fully excluded. The store-level unique token index makes that window
//! irrelevant for distinct records.

use std::sync::Arc;

use tracing::{error, warn};

use crate::db::schemas::{
    CreateLinkDoc, SendLinkDoc, TallyLinkDoc, UserLinkDoc, VoteLinkDoc, MAX_VOTE_OPTIONS,
    MIN_VOTE_OPTIONS, PLACEHOLDER_ADDRESS,
};
use crate::db::InsertOutcome;
use crate::links::token;
use crate::store::LinkStore;
use crate::types::{Result, WicketError};

/// Attempts before giving up on token generation; one retry has never been
/// observed, the loop exists for the unique-index contract
const TOKEN_INSERT_ATTEMPTS: usize = 3;

/// Action kinds, one per web page path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Connect,
    Send,
    Create,
    Vote,
    Tally,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Send => "send",
            Self::Create => "create",
            Self::Vote => "vote",
            Self::Tally => "tally",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "connect" => Some(Self::Connect),
            "send" => Some(Self::Send),
            "create" => Some(Self::Create),
            "vote" => Some(Self::Vote),
            "tally" => Some(Self::Tally),
            _ => None,
        }
    }
}

/// Syntactic address check: placeholder prefix plus at least one more
/// alphanumeric character
pub fn is_valid_address(address: &str) -> bool {
    address.len() > PLACEHOLDER_ADDRESS.len()
        && address.starts_with(PLACEHOLDER_ADDRESS)
        && address[PLACEHOLDER_ADDRESS.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
}

/// Creates pending records and applies web-side completions
pub struct LinkService {
    store: Arc<LinkStore>,
    web_origin: String,
}

impl LinkService {
    pub fn new(store: Arc<LinkStore>, web_origin: &str) -> Self {
        Self {
            store,
            web_origin: web_origin.trim_end_matches('/').to_string(),
        }
    }

    /// User-facing URL for a pending action
    pub fn link_url(&self, kind: LinkKind, token: &str) -> String {
        format!("{}/{}/{}", self.web_origin, kind.as_str(), token)
    }

    fn exhausted(kind: LinkKind) -> WicketError {
        WicketError::Database(format!(
            "token generation kept colliding for {} link",
            kind.as_str()
        ))
    }

    // --- Creation ---

    /// Create a pending wallet connection for a chat user
    pub async fn create_user_link(&self, user: &str) -> Result<(UserLinkDoc, String)> {
        for _ in 0..TOKEN_INSERT_ATTEMPTS {
            let link = UserLinkDoc::new(user, &token::generate());
            match self.store.insert_user_link(&link).await? {
                InsertOutcome::Inserted => {
                    let url = self.link_url(LinkKind::Connect, &link.token);
                    return Ok((link, url));
                }
                InsertOutcome::DuplicateKey => {
                    warn!(user = %user, "Connect token collision, regenerating");
                }
            }
        }
        Err(Self::exhausted(LinkKind::Connect))
    }

    /// Create a pending transfer to an already-resolved recipient address
    pub async fn create_send_link(
        &self,
        user: &str,
        to_address: &str,
        amount: f64,
    ) -> Result<(SendLinkDoc, String)> {
        if amount <= 0.0 {
            return Err(WicketError::InvalidInput("amount must be positive".to_string()));
        }
        for _ in 0..TOKEN_INSERT_ATTEMPTS {
            let link = SendLinkDoc::new(user, &token::generate(), to_address, amount);
            match self.store.insert_send_link(&link).await? {
                InsertOutcome::Inserted => {
                    let url = self.link_url(LinkKind::Send, &link.token);
                    return Ok((link, url));
                }
                InsertOutcome::DuplicateKey => {
                    warn!(user = %user, "Send token collision, regenerating");
                }
            }
        }
        Err(Self::exhausted(LinkKind::Send))
    }

    /// Create a pending vote-creation; options are fixed at creation time
    pub async fn create_create_link(
        &self,
        user: &str,
        topic: &str,
        options: Vec<String>,
        channel_id: &str,
    ) -> Result<(CreateLinkDoc, String)> {
        if topic.trim().is_empty() {
            return Err(WicketError::InvalidInput("topic must not be empty".to_string()));
        }
        if options.len() < MIN_VOTE_OPTIONS || options.len() > MAX_VOTE_OPTIONS {
            return Err(WicketError::InvalidInput(format!(
                "a vote needs {} to {} options, got {}",
                MIN_VOTE_OPTIONS,
                MAX_VOTE_OPTIONS,
                options.len()
            )));
        }
        for _ in 0..TOKEN_INSERT_ATTEMPTS {
            let link = CreateLinkDoc::new(user, &token::generate(), topic, options.clone(), channel_id);
            match self.store.insert_create_link(&link).await? {
                InsertOutcome::Inserted => {
                    let url = self.link_url(LinkKind::Create, &link.token);
                    return Ok((link, url));
                }
                InsertOutcome::DuplicateKey => {
                    warn!(user = %user, "Create token collision, regenerating");
                }
            }
        }
        Err(Self::exhausted(LinkKind::Create))
    }

    /// Create a pending cast vote for a choice on an existing vote
    pub async fn create_vote_link(
        &self,
        user: &str,
        create_id: &str,
        choice: u32,
    ) -> Result<(VoteLinkDoc, String)> {
        let create = self
            .store
            .create_link_by_id(create_id)
            .await?
            .ok_or_else(|| WicketError::NotFound(format!("vote {} not found", create_id)))?;
        if choice as usize >= create.options.len() {
            return Err(WicketError::InvalidInput(format!(
                "choice {} out of range for {} options",
                choice,
                create.options.len()
            )));
        }
        for _ in 0..TOKEN_INSERT_ATTEMPTS {
            let link = VoteLinkDoc::new(user, &token::generate(), choice, create_id);
            match self.store.insert_vote_link(&link).await? {
                InsertOutcome::Inserted => {
                    let url = self.link_url(LinkKind::Vote, &link.token);
                    return Ok((link, url));
                }
                InsertOutcome::DuplicateKey => {
                    warn!(user = %user, "Vote token collision, regenerating");
                }
            }
        }
        Err(Self::exhausted(LinkKind::Vote))
    }

    /// Create a pending declare-winner action for an existing vote
    pub async fn create_tally_link(&self, user: &str, create_id: &str) -> Result<(TallyLinkDoc, String)> {
        if self.store.create_link_by_id(create_id).await?.is_none() {
            return Err(WicketError::NotFound(format!("vote {} not found", create_id)));
        }
        for _ in 0..TOKEN_INSERT_ATTEMPTS {
            let link = TallyLinkDoc::new(user, &token::generate(), create_id);
            match self.store.insert_tally_link(&link).await? {
                InsertOutcome::Inserted => {
                    let url = self.link_url(LinkKind::Tally, &link.token);
                    return Ok((link, url));
                }
                InsertOutcome::DuplicateKey => {
                    warn!(user = %user, "Tally token collision, regenerating");
                }
            }
        }
        Err(Self::exhausted(LinkKind::Tally))
    }

    // --- Completion ---

    fn not_found(kind: LinkKind) -> WicketError {
        WicketError::NotFound(format!("no {} link for that token", kind.as_str()))
    }

    fn already_completed(kind: LinkKind) -> WicketError {
        WicketError::AlreadyCompleted(format!("{} link is already completed", kind.as_str()))
    }

    /// Write the wallet address onto a pending UserLink
    pub async fn complete_user_link(&self, token: &str, address: &str) -> Result<UserLinkDoc> {
        if !is_valid_address(address) {
            return Err(WicketError::InvalidInput(format!(
                "'{}' is not a valid address",
                address
            )));
        }
        let mut link = self
            .store
            .user_link_by_token(token)
            .await?
            .ok_or_else(|| Self::not_found(LinkKind::Connect))?;
        if !link.is_placeholder() {
            return Err(Self::already_completed(LinkKind::Connect));
        }
        self.store.set_user_link_address(token, address).await?;
        link.address = address.to_string();
        Ok(link)
    }

    /// Write the transaction hash and network onto a pending SendLink; the
    /// store update is what the change notifier observes
    pub async fn complete_send_link(
        &self,
        token: &str,
        transaction_hash: &str,
        network: &str,
    ) -> Result<SendLinkDoc> {
        let mut link = self
            .store
            .send_link_by_token(token)
            .await?
            .ok_or_else(|| Self::not_found(LinkKind::Send))?;
        if link.is_completed() {
            return Err(Self::already_completed(LinkKind::Send));
        }
        self.store
            .complete_send_link(token, transaction_hash, network)
            .await?;
        link.transaction_hash = Some(transaction_hash.to_string());
        link.network = Some(network.to_string());
        Ok(link)
    }

    /// Write the on-chain vote id onto a pending CreateLink
    pub async fn complete_create_link(&self, token: &str, vote_id: &str) -> Result<CreateLinkDoc> {
        let mut link = self
            .store
            .create_link_by_token(token)
            .await?
            .ok_or_else(|| Self::not_found(LinkKind::Create))?;
        if link.is_completed() {
            return Err(Self::already_completed(LinkKind::Create));
        }
        self.store.set_create_link_vote_id(token, vote_id).await?;
        link.vote_id = Some(vote_id.to_string());
        Ok(link)
    }

    /// Write the transaction hash and network onto a pending VoteLink
    pub async fn complete_vote_link(
        &self,
        token: &str,
        transaction_hash: &str,
        network: &str,
    ) -> Result<VoteLinkDoc> {
        let mut link = self
            .store
            .vote_link_by_token(token)
            .await?
            .ok_or_else(|| Self::not_found(LinkKind::Vote))?;
        if link.is_completed() {
            return Err(Self::already_completed(LinkKind::Vote));
        }
        self.store
            .complete_vote_link(token, transaction_hash, network)
            .await?;
        link.transaction_hash = Some(transaction_hash.to_string());
        link.network = Some(network.to_string());
        Ok(link)
    }

    /// Complete a TallyLink and mark the referenced CreateLink finished.
    ///
    /// The two writes are one logical operation but not a transaction: if the
    /// secondary CreateLink update fails, the tally completion stands and the
    /// gap is logged.
    pub async fn complete_tally_link(
        &self,
        token: &str,
        transaction_hash: &str,
        network: &str,
    ) -> Result<TallyLinkDoc> {
        let mut link = self
            .store
            .tally_link_by_token(token)
            .await?
            .ok_or_else(|| Self::not_found(LinkKind::Tally))?;
        if link.is_completed() {
            return Err(Self::already_completed(LinkKind::Tally));
        }
        self.store
            .complete_tally_link(token, transaction_hash, network)
            .await?;
        link.transaction_hash = Some(transaction_hash.to_string());
        link.network = Some(network.to_string());

        if let Err(e) = self.store.set_create_link_finished(&link.create_id, true).await {
            error!(
                create_id = %link.create_id,
                error = %e,
                "Tally completed but marking the vote finished failed"
            );
        }
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (Arc<LinkStore>, LinkService) {
        let store = Arc::new(LinkStore::memory());
        let service = LinkService::new(Arc::clone(&store), "http://localhost:3000/");
        (store, service)
    }

    #[test]
    fn test_address_syntax() {
        assert!(is_valid_address("0xabc123"));
        assert!(!is_valid_address("0x"));
        assert!(!is_valid_address("abc123"));
        assert!(!is_valid_address("0xabc 123"));
    }

    #[tokio::test]
    async fn test_link_url_shape() {
        let (_, service) = service();
        let (link, url) = service.create_user_link("alice").await.unwrap();
        assert_eq!(url, format!("http://localhost:3000/connect/{}", link.token));
    }

    #[tokio::test]
    async fn test_connect_completion_is_idempotent_rejecting() {
        let (store, service) = service();
        let (link, _) = service.create_user_link("alice").await.unwrap();

        service.complete_user_link(&link.token, "0xaddrA").await.unwrap();

        // Second completion is rejected regardless of payload and the first
        // caller's result stands
        let err = service
            .complete_user_link(&link.token, "0xaddrB")
            .await
            .unwrap_err();
        assert!(matches!(err, WicketError::AlreadyCompleted(_)));

        let stored = store.user_link_by_token(&link.token).await.unwrap().unwrap();
        assert_eq!(stored.address, "0xaddrA");
    }

    #[tokio::test]
    async fn test_send_round_trip_keeps_all_fields() {
        let (store, service) = service();
        let (link, _) = service.create_send_link("alice", "0xabc", 5.0).await.unwrap();

        let completed = service
            .complete_send_link(&link.token, "h1", "Testnet")
            .await
            .unwrap();
        assert_eq!(completed.amount, 5.0);
        assert_eq!(completed.to_address, "0xabc");

        let stored = store.send_link_by_token(&link.token).await.unwrap().unwrap();
        assert_eq!(stored.amount, 5.0);
        assert_eq!(stored.to_address, "0xabc");
        assert_eq!(stored.transaction_hash.as_deref(), Some("h1"));
        assert_eq!(stored.network.as_deref(), Some("Testnet"));

        let err = service
            .complete_send_link(&link.token, "h2", "Mainnet")
            .await
            .unwrap_err();
        assert!(matches!(err, WicketError::AlreadyCompleted(_)));
        let stored = store.send_link_by_token(&link.token).await.unwrap().unwrap();
        assert_eq!(stored.transaction_hash.as_deref(), Some("h1"));
    }

    #[tokio::test]
    async fn test_completion_only_touches_its_own_token() {
        let (store, service) = service();
        let (first, _) = service.create_send_link("alice", "0xaaa", 1.0).await.unwrap();
        let (second, _) = service.create_send_link("alice", "0xbbb", 2.0).await.unwrap();
        assert_ne!(first.token, second.token);

        service.complete_send_link(&first.token, "h1", "Testnet").await.unwrap();

        let other = store.send_link_by_token(&second.token).await.unwrap().unwrap();
        assert!(other.transaction_hash.is_none());
    }

    #[tokio::test]
    async fn test_create_link_option_bounds() {
        let (_, service) = service();
        let one = vec!["only".to_string()];
        let err = service
            .create_create_link("alice", "Lunch", one, "chan")
            .await
            .unwrap_err();
        assert!(matches!(err, WicketError::InvalidInput(_)));

        let eleven: Vec<String> = (0..11).map(|i| format!("opt{}", i)).collect();
        let err = service
            .create_create_link("alice", "Lunch", eleven, "chan")
            .await
            .unwrap_err();
        assert!(matches!(err, WicketError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_vote_link_checks_choice_range() {
        let (_, service) = service();
        let (create, _) = service
            .create_create_link("alice", "Lunch", vec!["a".into(), "b".into()], "chan")
            .await
            .unwrap();

        let err = service
            .create_vote_link("bob", &create.id, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, WicketError::InvalidInput(_)));

        let (vote, _) = service.create_vote_link("bob", &create.id, 1).await.unwrap();
        assert_eq!(vote.create_id, create.id);
    }

    #[tokio::test]
    async fn test_tally_completion_finishes_the_vote() {
        let (store, service) = service();
        let (create, _) = service
            .create_create_link("alice", "Lunch", vec!["a".into(), "b".into()], "chan")
            .await
            .unwrap();
        let (tally, _) = service.create_tally_link("alice", &create.id).await.unwrap();

        service
            .complete_tally_link(&tally.token, "h1", "Testnet")
            .await
            .unwrap();

        let stored = store.create_link_by_id(&create.id).await.unwrap().unwrap();
        assert!(stored.is_finished());
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let (_, service) = service();
        let err = service
            .complete_send_link("missing", "h1", "Testnet")
            .await
            .unwrap_err();
        assert!(matches!(err, WicketError::NotFound(_)));
    }
}
