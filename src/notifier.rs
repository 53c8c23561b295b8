//! Change notifier
//!
//! One standing background task for the lifetime of the process. It
//! subscribes to update events on the SendLink collection and delivers a
//! direct message to the sender and, when the recipient address resolves to
//! a chat user, to the receiver. Events are processed one at a time in
//! arrival order; each event re-reads current state, so overlapping events
//! need no coordination.
//!
//! Delivery is fire-and-forget: a failed message is logged and the record
//! state is never rolled back or retried.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::chat::DirectMessenger;
use crate::db::schemas::SendLinkDoc;
use crate::network::{explorer_link, TOKEN_SYMBOL};
use crate::resolver::AddressResolver;
use crate::store::LinkStore;
use crate::types::Result;

pub struct ChangeNotifier {
    store: Arc<LinkStore>,
    resolver: Arc<AddressResolver>,
    messenger: Arc<dyn DirectMessenger>,
}

/// Handle to the running notifier task
pub struct NotifierHandle {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl NotifierHandle {
    /// Signal shutdown and wait for the task to drain
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            warn!("Notifier task join failed: {}", e);
        }
    }
}

impl ChangeNotifier {
    pub fn new(
        store: Arc<LinkStore>,
        resolver: Arc<AddressResolver>,
        messenger: Arc<dyn DirectMessenger>,
    ) -> Self {
        Self {
            store,
            resolver,
            messenger,
        }
    }

    /// Subscribe to SendLink updates and start the watcher task
    pub async fn spawn(self) -> Result<NotifierHandle> {
        let mut events = self.store.subscribe_send_link_updates().await?;
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            info!("Change notifier started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Change notifier shutting down");
                        break;
                    }
                    id = events.next_updated_id() => match id {
                        Some(id) => self.handle_update(&id).await,
                        None => {
                            warn!("SendLink update stream ended");
                            break;
                        }
                    }
                }
            }
        });

        Ok(NotifierHandle { shutdown_tx, handle })
    }

    /// Process one update event. The event carries only the record id; the
    /// full document is reloaded here.
    async fn handle_update(&self, id: &str) {
        let record = match self.store.send_link_by_id(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(id = %id, "Updated SendLink not found on reload");
                return;
            }
            Err(e) => {
                error!(id = %id, "Failed to reload SendLink: {}", e);
                return;
            }
        };
        let Some(transaction_hash) = record.transaction_hash.as_deref() else {
            // An update that did not complete the transfer is not ours
            return;
        };

        let explorer = record
            .network
            .as_deref()
            .and_then(|n| explorer_link(n, transaction_hash));

        self.notify_sender(&record, explorer.as_deref()).await;
        self.notify_receiver(&record, explorer.as_deref()).await;
    }

    async fn notify_sender(&self, record: &SendLinkDoc, explorer: Option<&str>) {
        let content = with_explorer(
            format!(
                "You sent {} {} to {}!",
                record.amount, TOKEN_SYMBOL, record.to_address
            ),
            explorer,
        );
        if let Err(e) = self.messenger.send_dm(&record.user, &content).await {
            warn!(user = %record.user, "Sender notification failed: {}", e);
        }
    }

    async fn notify_receiver(&self, record: &SendLinkDoc, explorer: Option<&str>) {
        // Inverse resolution: the recipient is known only by address
        let receiver = match self.resolver.resolve_user_by_address(&record.to_address).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(address = %record.to_address, "Receiver resolution failed: {}", e);
                return;
            }
        };
        let content = with_explorer(
            format!("You received {} {}!", record.amount, TOKEN_SYMBOL),
            explorer,
        );
        if let Err(e) = self.messenger.send_dm(&receiver, &content).await {
            warn!(user = %receiver, "Receiver notification failed: {}", e);
        }
    }
}

fn with_explorer(mut content: String, explorer: Option<&str>) -> String {
    if let Some(link) = explorer {
        content.push_str(&format!("\nCheck the transaction at [Explorer]({}) 🔎", link));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::UserLinkDoc;
    use crate::types::WicketError;
    use async_trait::async_trait;
    use bson::DateTime;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records DMs; optionally fails every delivery
    struct RecordingMessenger {
        messages: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingMessenger {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                messages: Mutex::new(Vec::new()),
                fail,
            })
        }

        fn messages(&self) -> Vec<(String, String)> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DirectMessenger for RecordingMessenger {
        async fn send_dm(&self, user_id: &str, content: &str) -> crate::types::Result<()> {
            if self.fail {
                return Err(WicketError::Delivery("simulated failure".to_string()));
            }
            self.messages
                .lock()
                .unwrap()
                .push((user_id.to_string(), content.to_string()));
            Ok(())
        }
    }

    async fn wait_for_messages(messenger: &RecordingMessenger, expected: usize) {
        for _ in 0..100 {
            if messenger.messages().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn fixtures(
        messenger: Arc<RecordingMessenger>,
    ) -> (Arc<LinkStore>, ChangeNotifier) {
        let store = Arc::new(LinkStore::memory());
        let resolver = Arc::new(AddressResolver::new(Arc::clone(&store)));
        let notifier = ChangeNotifier::new(Arc::clone(&store), resolver, messenger);
        (store, notifier)
    }

    async fn seed_receiver(store: &LinkStore, user: &str, address: &str) {
        let mut link = UserLinkDoc::new(user, &format!("ul-{}", user));
        link.address = address.to_string();
        link.generate_time = DateTime::from_millis(100);
        store.insert_user_link(&link).await.unwrap();
    }

    #[tokio::test]
    async fn test_completion_notifies_both_parties_once() {
        let messenger = RecordingMessenger::new(false);
        let (store, notifier) = fixtures(Arc::clone(&messenger));
        seed_receiver(&store, "bob", "0xabc").await;

        let link = crate::db::schemas::SendLinkDoc::new("alice", "s1", "0xabc", 5.0);
        store.insert_send_link(&link).await.unwrap();

        let handle = notifier.spawn().await.unwrap();
        store.complete_send_link("s1", "h1", "Testnet").await.unwrap();

        wait_for_messages(&messenger, 2).await;
        handle.stop().await;

        let messages = messenger.messages();
        assert_eq!(messages.len(), 2);

        let sender_dm = messages.iter().find(|(user, _)| user == "alice").unwrap();
        assert!(sender_dm.1.contains("You sent 5"));
        assert!(sender_dm.1.contains("0xabc"));
        assert!(sender_dm.1.contains("explorer.aptoslabs.com/txn/h1?network=testnet"));

        let receiver_dm = messages.iter().find(|(user, _)| user == "bob").unwrap();
        assert!(receiver_dm.1.contains("You received 5"));
    }

    #[tokio::test]
    async fn test_unresolvable_receiver_gets_no_message() {
        let messenger = RecordingMessenger::new(false);
        let (store, notifier) = fixtures(Arc::clone(&messenger));

        let link = crate::db::schemas::SendLinkDoc::new("alice", "s1", "0xnobody", 2.0);
        store.insert_send_link(&link).await.unwrap();

        let handle = notifier.spawn().await.unwrap();
        store.complete_send_link("s1", "h1", "Testnet").await.unwrap();

        wait_for_messages(&messenger, 1).await;
        // Give a lingering receiver DM a chance to (wrongly) arrive
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await;

        let messages = messenger.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "alice");
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let messenger = RecordingMessenger::new(true);
        let (store, notifier) = fixtures(Arc::clone(&messenger));

        let link = crate::db::schemas::SendLinkDoc::new("alice", "s1", "0xabc", 2.0);
        store.insert_send_link(&link).await.unwrap();

        let handle = notifier.spawn().await.unwrap();
        store.complete_send_link("s1", "h1", "Testnet").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The task is still alive after failed deliveries and the record
        // keeps its completed state
        let record = store.send_link_by_token("s1").await.unwrap().unwrap();
        assert_eq!(record.transaction_hash.as_deref(), Some("h1"));
        handle.stop().await;
    }
}
