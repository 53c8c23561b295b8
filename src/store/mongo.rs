//! MongoDB backend for the link store
//!
//! Thin mapping from store operations onto the typed collections. Completion
//! writes are plain `$set` updates; the idempotency check lives in the
//! lifecycle layer, which reads the record first (an accepted non-atomic
//! guard, see the lifecycle module).

use bson::{doc, DateTime, Document};
use mongodb::change_stream::{event::ChangeStreamEvent, ChangeStream};

use crate::db::schemas::{
    CreateLinkDoc, SendLinkDoc, TallyLinkDoc, UserLinkDoc, VoteLinkDoc, CREATE_LINK_COLLECTION,
    SEND_LINK_COLLECTION, TALLY_LINK_COLLECTION, USER_LINK_COLLECTION, VOTE_LINK_COLLECTION,
};
use crate::db::{InsertOutcome, MongoClient, MongoCollection};
use crate::store::{HistoryFilter, UserLinkLookup, VoteListFilter};
use crate::types::Result;

/// Sort document for most-recent-first queries
fn newest_first() -> Document {
    doc! { "generate_time": -1 }
}

pub struct MongoStore {
    user_links: MongoCollection<UserLinkDoc>,
    send_links: MongoCollection<SendLinkDoc>,
    create_links: MongoCollection<CreateLinkDoc>,
    vote_links: MongoCollection<VoteLinkDoc>,
    tally_links: MongoCollection<TallyLinkDoc>,
}

impl MongoStore {
    /// Open the five collections and apply their indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            user_links: client.collection(USER_LINK_COLLECTION).await?,
            send_links: client.collection(SEND_LINK_COLLECTION).await?,
            create_links: client.collection(CREATE_LINK_COLLECTION).await?,
            vote_links: client.collection(VOTE_LINK_COLLECTION).await?,
            tally_links: client.collection(TALLY_LINK_COLLECTION).await?,
        })
    }

    // --- UserLink ---

    pub async fn insert_user_link(&self, link: &UserLinkDoc) -> Result<InsertOutcome> {
        self.user_links.insert_one(link).await
    }

    pub async fn user_link_by_token(&self, token: &str) -> Result<Option<UserLinkDoc>> {
        self.user_links.find_one(doc! { "token": token }).await
    }

    /// Latest UserLink matching the lookup key, optionally restricted to
    /// records strictly older than `before`
    pub async fn latest_user_link(
        &self,
        lookup: UserLinkLookup<'_>,
        before: Option<DateTime>,
    ) -> Result<Option<UserLinkDoc>> {
        let mut filter = match lookup {
            UserLinkLookup::ByUser(user) => doc! { "user": user },
            UserLinkLookup::ByAddress(address) => doc! { "address": address },
        };
        if let Some(cursor) = before {
            filter.insert("generate_time", doc! { "$lt": cursor });
        }
        self.user_links.find_one_sorted(filter, newest_first()).await
    }

    pub async fn set_user_link_address(&self, token: &str, address: &str) -> Result<()> {
        self.user_links
            .update_one(doc! { "token": token }, doc! { "$set": { "address": address } })
            .await?;
        Ok(())
    }

    // --- SendLink ---

    pub async fn insert_send_link(&self, link: &SendLinkDoc) -> Result<InsertOutcome> {
        self.send_links.insert_one(link).await
    }

    pub async fn send_link_by_token(&self, token: &str) -> Result<Option<SendLinkDoc>> {
        self.send_links.find_one(doc! { "token": token }).await
    }

    pub async fn send_link_by_id(&self, id: &str) -> Result<Option<SendLinkDoc>> {
        self.send_links.find_one(doc! { "_id": id }).await
    }

    pub async fn complete_send_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        self.send_links
            .update_one(
                doc! { "token": token },
                doc! { "$set": { "transaction_hash": hash, "network": network } },
            )
            .await?;
        Ok(())
    }

    /// Completed transfers for one history page, newest first
    pub async fn send_link_history(
        &self,
        filter: HistoryFilter<'_>,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<SendLinkDoc>> {
        let filter = match filter {
            HistoryFilter::Sender(user) => {
                doc! { "user": user, "transaction_hash": { "$ne": null } }
            }
            HistoryFilter::Receiver(address) => {
                doc! { "to_address": address, "transaction_hash": { "$ne": null } }
            }
        };
        self.send_links.find_many(filter, newest_first(), skip, limit).await
    }

    // --- CreateLink ---

    pub async fn insert_create_link(&self, link: &CreateLinkDoc) -> Result<InsertOutcome> {
        self.create_links.insert_one(link).await
    }

    pub async fn create_link_by_token(&self, token: &str) -> Result<Option<CreateLinkDoc>> {
        self.create_links.find_one(doc! { "token": token }).await
    }

    pub async fn create_link_by_id(&self, id: &str) -> Result<Option<CreateLinkDoc>> {
        self.create_links.find_one(doc! { "_id": id }).await
    }

    pub async fn list_create_links(&self, filter: VoteListFilter<'_>) -> Result<Vec<CreateLinkDoc>> {
        let mut query = doc! { "topic": { "$ne": null } };
        if filter.exclude_finished {
            query.insert("finished", doc! { "$ne": true });
        }
        if let Some(creator) = filter.creator {
            query.insert("user", creator);
        }
        self.create_links.find_all(query, newest_first()).await
    }

    pub async fn set_create_link_vote_id(&self, token: &str, vote_id: &str) -> Result<()> {
        self.create_links
            .update_one(doc! { "token": token }, doc! { "$set": { "vote_id": vote_id } })
            .await?;
        Ok(())
    }

    pub async fn set_create_link_finished(&self, id: &str, finished: bool) -> Result<()> {
        self.create_links
            .update_one(doc! { "_id": id }, doc! { "$set": { "finished": finished } })
            .await?;
        Ok(())
    }

    // --- VoteLink ---

    pub async fn insert_vote_link(&self, link: &VoteLinkDoc) -> Result<InsertOutcome> {
        self.vote_links.insert_one(link).await
    }

    pub async fn vote_link_by_token(&self, token: &str) -> Result<Option<VoteLinkDoc>> {
        self.vote_links.find_one(doc! { "token": token }).await
    }

    pub async fn complete_vote_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        self.vote_links
            .update_one(
                doc! { "token": token },
                doc! { "$set": { "transaction_hash": hash, "network": network } },
            )
            .await?;
        Ok(())
    }

    pub async fn vote_links_for(&self, create_id: &str) -> Result<Vec<VoteLinkDoc>> {
        self.vote_links
            .find_all(doc! { "create_id": create_id }, newest_first())
            .await
    }

    // --- TallyLink ---

    pub async fn insert_tally_link(&self, link: &TallyLinkDoc) -> Result<InsertOutcome> {
        self.tally_links.insert_one(link).await
    }

    pub async fn tally_link_by_token(&self, token: &str) -> Result<Option<TallyLinkDoc>> {
        self.tally_links.find_one(doc! { "token": token }).await
    }

    pub async fn complete_tally_link(&self, token: &str, hash: &str, network: &str) -> Result<()> {
        self.tally_links
            .update_one(
                doc! { "token": token },
                doc! { "$set": { "transaction_hash": hash, "network": network } },
            )
            .await?;
        Ok(())
    }

    // --- Change events ---

    /// Open a change stream over SendLink updates
    pub async fn watch_send_links(
        &self,
    ) -> Result<ChangeStream<ChangeStreamEvent<SendLinkDoc>>> {
        let pipeline = [doc! { "$match": { "operationType": "update" } }];
        let stream = self.send_links.inner().watch().pipeline(pipeline).await?;
        Ok(stream)
    }
}
