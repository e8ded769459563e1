//!
//! # Record Store
//!
//! [`Store`] is the single data access service the route handlers talk to.
//! Every operation takes a [`CollectionSpec`] so one implementation covers
//! posts, contacts, and users alike:
//!
//! - `list` pages through a collection, optionally narrowed by a keyword
//!   matched against the descriptor's searchable fields
//! - `create` stamps `created_at`/`updated_at` and returns the stored record
//! - `get` / `update` / `delete` address one record by its primary key
//! - `exists` probes for a field value without fetching the record
//!
//! Updates are partial: null fields are dropped before the write, and
//! `updated_at` is only bumped when the write actually changed a field.
//! Database errors never reach callers as-is; they are logged and collapse
//! into the opaque 500 contract.

use crate::config::{read_secret_file, Config};
use crate::db::collection::{
    primary_key_filter, projection_document, reshape_document, CollectionSpec,
};
use crate::error::ApiError;
use crate::models::pagination::Page;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, Credential, FindOneOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// The store could not be brought up.
#[derive(Debug)]
pub enum StoreSetupError {
    /// A credentials file named by the configuration could not be read.
    Credentials(std::io::Error),
    /// The driver rejected the connection options or the server did not
    /// answer the startup ping.
    Database(mongodb::error::Error),
}

impl fmt::Display for StoreSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSetupError::Credentials(error) => {
                write!(f, "Unable to read a database credentials file: {}", error)
            }
            StoreSetupError::Database(error) => {
                write!(f, "Unable to reach the database: {}", error)
            }
        }
    }
}

impl std::error::Error for StoreSetupError {}

impl From<std::io::Error> for StoreSetupError {
    fn from(error: std::io::Error) -> Self {
        StoreSetupError::Credentials(error)
    }
}

impl From<mongodb::error::Error> for StoreSetupError {
    fn from(error: mongodb::error::Error) -> Self {
        StoreSetupError::Database(error)
    }
}

/// Data access service shared across request handlers.
#[derive(Debug, Clone)]
pub struct Store {
    database: Database,
}

impl Store {
    /// Connects to the database named by the configuration, authenticating
    /// with credentials read from the configured secret files.
    ///
    /// The driver connects lazily, so a ping runs before the store is handed
    /// out. A store that fails the ping is never constructed.
    pub async fn connect(config: &Config) -> Result<Self, StoreSetupError> {
        let username = read_secret_file(&config.mongo_username_file)?;
        let password = read_secret_file(&config.mongo_password_file)?;

        let address = format!("mongodb://{}:{}", config.mongo_host, config.mongo_port);
        let mut options = ClientOptions::parse(&address).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.credential = Some(
            Credential::builder()
                .username(username)
                .password(password)
                .source(config.mongo_database.clone())
                .build(),
        );

        let client = Client::with_options(options)?;
        let database = client.database(&config.mongo_database);
        database.run_command(doc! { "ping": 1 }, None).await?;

        Ok(Store { database })
    }

    /// Wraps an already-connected database. Used by the migration runner and
    /// by tests that manage their own connection.
    pub fn with_database(database: Database) -> Self {
        Store { database }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, spec: &CollectionSpec) -> Collection<Document> {
        self.database.collection(spec.name)
    }

    /// Fetches one page of records.
    ///
    /// `url` is the request URL without its query string; pagination links
    /// are derived from it. `sort` defaults to most recently updated first.
    pub async fn list(
        &self,
        spec: &CollectionSpec,
        url: &str,
        page: u64,
        records_per_page: u64,
        keyword: Option<&str>,
        sort: Option<Document>,
    ) -> Result<Page, ApiError> {
        let collection = self.collection(spec);
        let filter = keyword.map(|keyword| keyword_filter(spec.search_fields, keyword));
        let sort = sort.unwrap_or_else(|| doc! { "updated_at": -1 });

        let total_records = collection.count_documents(filter.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(sort)
            .skip((page - 1) * records_per_page)
            .limit(records_per_page as i64)
            .projection(projection_document(spec))
            .build();
        let mut cursor = collection.find(filter, options).await?;

        let mut data = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            data.push(reshape_document(document));
        }

        Ok(Page::new(data, url, page, records_per_page, total_records))
    }

    /// Inserts a record and returns it as stored.
    ///
    /// `created_at` and `updated_at` are stamped with the same instant. The
    /// record is re-read through the descriptor's projection so the caller
    /// sees exactly what a subsequent `get` would return.
    pub async fn create(&self, spec: &CollectionSpec, mut fields: Document) -> Result<Value, ApiError> {
        let now = bson::DateTime::now();
        fields.insert("created_at", now);
        fields.insert("updated_at", now);

        let result = self.collection(spec).insert_one(&fields, None).await?;

        let filter = if spec.primary_key == "_id" {
            doc! { "_id": result.inserted_id }
        } else {
            let mut filter = Document::new();
            filter.insert(
                spec.primary_key,
                fields.get(spec.primary_key).cloned().unwrap_or(Bson::Null),
            );
            filter
        };
        self.find_one(spec, filter).await
    }

    /// Fetches one record by its primary key.
    pub async fn get(&self, spec: &CollectionSpec, identifier: &str) -> Result<Value, ApiError> {
        self.find_one(spec, primary_key_filter(spec, identifier)?).await
    }

    /// Applies a partial update and returns the record as stored afterwards.
    ///
    /// Null fields are dropped first; an update that ends up empty performs
    /// no write at all. `updated_at` is bumped in a second write, and only
    /// when the first one modified a field, so re-sending the current values
    /// leaves the record untouched.
    pub async fn update(
        &self,
        spec: &CollectionSpec,
        identifier: &str,
        fields: Document,
    ) -> Result<Value, ApiError> {
        let changes = drop_null_fields(fields);
        if !changes.is_empty() {
            let filter = primary_key_filter(spec, identifier)?;
            let result = self
                .collection(spec)
                .update_one(filter.clone(), doc! { "$set": changes }, None)
                .await?;
            if result.matched_count == 0 {
                return Err(ApiError::not_found());
            }
            if result.modified_count > 0 {
                let stamp = doc! { "$set": { "updated_at": bson::DateTime::now() } };
                self.collection(spec).update_one(filter, stamp, None).await?;
            }
        }
        self.get(spec, identifier).await
    }

    /// Deletes one record by its primary key.
    pub async fn delete(&self, spec: &CollectionSpec, identifier: &str) -> Result<(), ApiError> {
        let result = self
            .collection(spec)
            .delete_one(primary_key_filter(spec, identifier)?, None)
            .await?;
        if result.deleted_count == 0 {
            return Err(ApiError::not_found());
        }
        Ok(())
    }

    /// Reports whether any record carries the given field value.
    pub async fn exists(
        &self,
        spec: &CollectionSpec,
        field: &str,
        value: &str,
    ) -> Result<bool, ApiError> {
        let mut filter = Document::new();
        filter.insert(field, value);
        let count = self.collection(spec).count_documents(filter, None).await?;
        Ok(count > 0)
    }

    async fn find_one(&self, spec: &CollectionSpec, filter: Document) -> Result<Value, ApiError> {
        let options = FindOneOptions::builder()
            .projection(projection_document(spec))
            .build();
        match self.collection(spec).find_one(filter, options).await? {
            Some(document) => Ok(reshape_document(document)),
            None => Err(ApiError::not_found()),
        }
    }
}

/// Builds the filter matching a keyword against any searchable field,
/// case-insensitively and across line boundaries.
fn keyword_filter(search_fields: &[&str], keyword: &str) -> Document {
    let conditions: Vec<Document> = search_fields
        .iter()
        .map(|field| {
            let mut condition = Document::new();
            condition.insert(*field, doc! { "$regex": keyword, "$options": "im" });
            condition
        })
        .collect();
    doc! { "$or": conditions }
}

fn drop_null_fields(fields: Document) -> Document {
    fields
        .into_iter()
        .filter(|(_, value)| *value != Bson::Null)
        .collect()
}
