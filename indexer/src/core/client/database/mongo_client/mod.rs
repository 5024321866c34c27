use std::sync::Arc;

use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneOptions, FindOptions, IndexOptions, ReplaceOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::client::database::error::DatabaseError;

/// Generic MongoDB client with no business logic knowledge
///
/// Pure CRUD plus index management; the repositories in [`super::mongo`] build their queries on top of it.
pub struct MongoClient {
    database: Arc<Database>,
}

impl MongoClient {
    /// Create a new MongoClient connection
    pub async fn new(connection_uri: &str, database_name: &str) -> Result<Self, DatabaseError> {
        let client = Client::with_uri_str(connection_uri).await?;
        let database = Arc::new(client.database(database_name));
        Ok(Self { database })
    }

    /// Get a typed collection
    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Find a single document
    pub async fn find_one<T>(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> Result<Option<T>, DatabaseError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        Ok(self.collection::<T>(collection).find_one(filter, options).await?)
    }

    /// Find a single document sorted by `sort`
    pub async fn find_first<T>(
        &self,
        collection: &str,
        filter: Document,
        sort: Document,
    ) -> Result<Option<T>, DatabaseError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let options = FindOneOptions::builder().sort(sort).build();
        self.find_one(collection, filter, Some(options)).await
    }

    /// Find multiple documents
    pub async fn find_many<T>(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>, DatabaseError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let cursor = self.collection::<T>(collection).find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Insert a single document
    pub async fn insert_one<T>(&self, collection: &str, doc: &T) -> Result<(), DatabaseError>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>(collection).insert_one(doc, None).await.map_err(DatabaseError::from_write)?;
        Ok(())
    }

    /// Insert several documents in order. Stops at the first failing document.
    pub async fn insert_many<T>(&self, collection: &str, docs: &[T]) -> Result<(), DatabaseError>
    where
        T: Serialize + Send + Sync,
    {
        if docs.is_empty() {
            return Ok(());
        }
        self.collection::<T>(collection).insert_many(docs, None).await.map_err(DatabaseError::from_write)?;
        Ok(())
    }

    /// Replace the document matching `filter`. Returns the number of matched documents.
    pub async fn replace_one<T>(
        &self,
        collection: &str,
        filter: Document,
        doc: &T,
        upsert: bool,
    ) -> Result<u64, DatabaseError>
    where
        T: Serialize + Send + Sync,
    {
        let options = ReplaceOptions::builder().upsert(upsert).build();
        let result = self.collection::<T>(collection).replace_one(filter, doc, options).await?;
        Ok(result.matched_count + u64::from(result.upserted_id.is_some()))
    }

    /// Create a unique index over `keys` on a collection
    pub async fn create_unique_index(&self, collection: &str, keys: Document) -> Result<(), DatabaseError> {
        let index = IndexModel::builder().keys(keys).options(IndexOptions::builder().unique(true).build()).build();
        self.collection::<Document>(collection).create_indexes(vec![index], None).await?;
        Ok(())
    }

    /// Create a plain index over `keys` on a collection
    pub async fn create_index(&self, collection: &str, keys: Document) -> Result<(), DatabaseError> {
        let index = IndexModel::builder().keys(keys).build();
        self.collection::<Document>(collection).create_indexes(vec![index], None).await?;
        Ok(())
    }

    /// Health check - ping the database
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
