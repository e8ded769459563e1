//!
//! # Database Migrations
//!
//! The schema-less store still needs its collections and indexes managed:
//! the unique email index on users is load-bearing, and the search and sort
//! fields of every collection are indexed. Migrations are ordered by a
//! timestamp identifier, applied oldest first, reverted newest first, and
//! recorded in the `database_migrations` collection so a rerun skips what
//! already happened.
//!
//! The `migrate` binary drives [`up`] and [`down`].

use bson::{doc, Document};
use futures::future::BoxFuture;
use futures::FutureExt;
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

/// Collection recording which migrations have been applied.
pub const TRACKING_COLLECTION: &str = "database_migrations";

type MigrationStep = fn(&Database) -> BoxFuture<'_, mongodb::error::Result<()>>;

/// One reversible schema change.
pub struct Migration {
    /// Timestamp identifier; strictly ascending across the registry.
    pub id: &'static str,
    pub description: &'static str,
    pub upgrade: MigrationStep,
    pub downgrade: MigrationStep,
}

/// Every migration, oldest first.
pub fn registry() -> Vec<Migration> {
    vec![
        Migration {
            id: "20200923170803",
            description: "create_user_collection",
            upgrade: create_user_collection,
            downgrade: drop_user_collection,
        },
        Migration {
            id: "20201006190011",
            description: "create_post_collection",
            upgrade: create_post_collection,
            downgrade: drop_post_collection,
        },
        Migration {
            id: "20210211102823",
            description: "create_contact_collection",
            upgrade: create_contact_collection,
            downgrade: drop_contact_collection,
        },
    ]
}

/// Applies every pending migration, oldest first.
///
/// With `to` given, stops after the migration carrying that identifier.
/// Returns how many migrations were applied.
pub async fn up(database: &Database, to: Option<&str>) -> mongodb::error::Result<usize> {
    let mut applied = 0;
    for migration in registry() {
        if let Some(limit) = to {
            if migration.id > limit {
                break;
            }
        }
        if is_applied(database, migration.id).await? {
            continue;
        }
        log::info!("Applying {} {}", migration.id, migration.description);
        (migration.upgrade)(database).await?;
        record(database, &migration).await?;
        applied += 1;
    }
    Ok(applied)
}

/// Reverts applied migrations, newest first.
///
/// With `to` given, migrations up to and including that identifier stay
/// applied. Returns how many migrations were reverted.
pub async fn down(database: &Database, to: Option<&str>) -> mongodb::error::Result<usize> {
    let mut reverted = 0;
    for migration in registry().iter().rev() {
        if let Some(limit) = to {
            if migration.id <= limit {
                break;
            }
        }
        if !is_applied(database, migration.id).await? {
            continue;
        }
        log::info!("Reverting {} {}", migration.id, migration.description);
        (migration.downgrade)(database).await?;
        erase(database, migration).await?;
        reverted += 1;
    }
    Ok(reverted)
}

async fn is_applied(database: &Database, id: &str) -> mongodb::error::Result<bool> {
    let count = database
        .collection::<Document>(TRACKING_COLLECTION)
        .count_documents(doc! { "migration_id": id }, None)
        .await?;
    Ok(count > 0)
}

async fn record(database: &Database, migration: &Migration) -> mongodb::error::Result<()> {
    database
        .collection::<Document>(TRACKING_COLLECTION)
        .insert_one(
            doc! {
                "migration_id": migration.id,
                "description": migration.description,
                "applied_at": bson::DateTime::now(),
            },
            None,
        )
        .await?;
    Ok(())
}

async fn erase(database: &Database, migration: &Migration) -> mongodb::error::Result<()> {
    database
        .collection::<Document>(TRACKING_COLLECTION)
        .delete_one(doc! { "migration_id": migration.id }, None)
        .await?;
    Ok(())
}

fn single_field_index(field: &str) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(field, 1);
    IndexModel::builder().keys(keys).build()
}

fn create_user_collection(database: &Database) -> BoxFuture<'_, mongodb::error::Result<()>> {
    async move {
        database.create_collection("user", None).await?;
        let collection = database.collection::<Document>("user");
        // The email is the collection's primary key; addressing breaks
        // without uniqueness.
        let unique = IndexOptions::builder().unique(true).build();
        collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
                None,
            )
            .await?;
        for field in ["first_name", "last_name", "updated_at"] {
            collection.create_index(single_field_index(field), None).await?;
        }
        Ok(())
    }
    .boxed()
}

fn drop_user_collection(database: &Database) -> BoxFuture<'_, mongodb::error::Result<()>> {
    async move { database.collection::<Document>("user").drop(None).await }.boxed()
}

fn create_post_collection(database: &Database) -> BoxFuture<'_, mongodb::error::Result<()>> {
    async move {
        database.create_collection("post", None).await?;
        let collection = database.collection::<Document>("post");
        for field in ["owner", "message", "updated_at"] {
            collection.create_index(single_field_index(field), None).await?;
        }
        Ok(())
    }
    .boxed()
}

fn drop_post_collection(database: &Database) -> BoxFuture<'_, mongodb::error::Result<()>> {
    async move { database.collection::<Document>("post").drop(None).await }.boxed()
}

fn create_contact_collection(database: &Database) -> BoxFuture<'_, mongodb::error::Result<()>> {
    async move {
        database.create_collection("contact", None).await?;
        let collection = database.collection::<Document>("contact");
        for field in ["first_name", "last_name", "email", "message", "created_at"] {
            collection.create_index(single_field_index(field), None).await?;
        }
        Ok(())
    }
    .boxed()
}

fn drop_contact_collection(database: &Database) -> BoxFuture<'_, mongodb::error::Result<()>> {
    async move { database.collection::<Document>("contact").drop(None).await }.boxed()
}
