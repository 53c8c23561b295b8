//! MongoDB client and collection wrapper

use bson::{doc, Document};
use futures_util::StreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{FindOneOptions, FindOptions, IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::types::WicketError;

/// Duplicate-key error code raised when a unique index is violated
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, WicketError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| WicketError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| WicketError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, WicketError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Outcome of an insert against a unique-indexed collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A unique index rejected the document (token collision)
    DuplicateKey,
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, WicketError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), WicketError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| WicketError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, reporting unique-index conflicts distinctly
    pub async fn insert_one(&self, item: &T) -> Result<InsertOutcome, WicketError> {
        match self.inner.insert_one(item).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_duplicate_key(&e) => Ok(InsertOutcome::DuplicateKey),
            Err(e) => Err(WicketError::Database(format!("Insert failed: {}", e))),
        }
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, WicketError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| WicketError::Database(format!("Find failed: {}", e)))
    }

    /// Find the first document matching `filter` under the given sort order
    pub async fn find_one_sorted(
        &self,
        filter: Document,
        sort: Document,
    ) -> Result<Option<T>, WicketError> {
        let options = FindOneOptions::builder().sort(sort).build();
        self.inner
            .find_one(filter)
            .with_options(options)
            .await
            .map_err(|e| WicketError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter with sort, skip, and limit
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Document,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<T>, WicketError> {
        let options = FindOptions::builder().sort(sort).skip(skip).limit(limit).build();

        let cursor = self
            .inner
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| WicketError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|item| async {
                match item {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Find all documents matching `filter` under the given sort order
    pub async fn find_all(&self, filter: Document, sort: Document) -> Result<Vec<T>, WicketError> {
        self.find_many(filter, sort, 0, 0).await
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, WicketError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| WicketError::Database(format!("Update failed: {}", e)))
    }

    /// Get the underlying collection for advanced operations (change streams)
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// Check whether a MongoDB error is a unique-index violation
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_err)) => {
            write_err.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    // Integration tests require a running MongoDB instance; the in-memory
    // store backend covers the query semantics (see store::memory).
}
