use crate::db::CollectionSpec;
use bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Storage descriptor for registered users.
///
/// Users are addressed by email rather than by the store-native id, which is
/// why `_id` is absent from the projection: the identifier callers work with
/// IS the email. Identity itself lives at the identity provider; this
/// collection only carries the profile fields the API manages.
pub const USER_COLLECTION: CollectionSpec = CollectionSpec {
    name: "user",
    primary_key: "email",
    projected_fields: &[
        "first_name",
        "last_name",
        "email",
        "job_title",
        "created_at",
        "updated_at",
    ],
    search_fields: &["first_name", "last_name", "email"],
};

/// Input structure for registering a user.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UserInput {
    /// Must be between 1 and 50 characters.
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,

    /// Must be between 1 and 50 characters.
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,

    /// Addressing key of the record. Must be unique across the collection.
    #[validate(email)]
    pub email: String,

    /// Must be between 1 and 100 characters.
    #[validate(length(min = 1, max = 100))]
    pub job_title: String,
}

/// Input structure for editing a user. The email is the address of the
/// record and cannot be changed; absent fields keep their stored value.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub job_title: Option<String>,
}

/// Profile of the signed-in user as reported by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Profile {
    /// Subject identifier of the user at the identity provider.
    pub identifier: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub job_title: Option<String>,
}

impl UserInput {
    pub fn document(&self) -> Document {
        doc! {
            "first_name": &self.first_name,
            "last_name": &self.last_name,
            "email": &self.email,
            "job_title": &self.job_title,
        }
    }
}

impl UserUpdate {
    pub fn document(&self) -> Document {
        let mut fields = Document::new();
        fields.insert(
            "first_name",
            self.first_name.as_deref().map_or(Bson::Null, Bson::from),
        );
        fields.insert(
            "last_name",
            self.last_name.as_deref().map_or(Bson::Null, Bson::from),
        );
        fields.insert(
            "job_title",
            self.job_title.as_deref().map_or(Bson::Null, Bson::from),
        );
        fields
    }
}
