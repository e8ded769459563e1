use crate::db::CollectionSpec;
use bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

/// Storage descriptor for noticeboard posts.
///
/// Posts are addressed by their store-native id and searched by message
/// text. The owner field holds the subject identifier of the user who
/// created the post; responses carry it under `relationships` instead.
pub const POST_COLLECTION: CollectionSpec = CollectionSpec {
    name: "post",
    primary_key: "_id",
    projected_fields: &["_id", "message", "owner", "created_at", "updated_at"],
    search_fields: &["message"],
};

/// Input structure for publishing a post.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PostInput {
    /// The message to publish.
    /// Must be between 10 and 500 characters.
    #[validate(length(min = 10, max = 500))]
    pub message: String,
}

/// Input structure for editing a post. Absent fields keep their stored
/// value.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PostUpdate {
    /// Replacement message, when given.
    /// Must be between 10 and 500 characters.
    #[validate(length(min = 10, max = 500))]
    pub message: Option<String>,
}

impl PostInput {
    /// The stored shape of a new post. The owner is the authenticated
    /// subject, never part of the request payload.
    pub fn document(&self, owner: &str) -> Document {
        doc! { "message": &self.message, "owner": owner }
    }
}

impl PostUpdate {
    pub fn document(&self) -> Document {
        let mut fields = Document::new();
        fields.insert("message", self.message.as_deref().map_or(Bson::Null, Bson::from));
        fields
    }
}

/// Moves the flat `owner` field of a stored post into the response shape:
/// `"relationships": { "owner": { "identifier": ... } }`.
pub fn add_relationships(post: &mut Value) {
    if let Some(fields) = post.as_object_mut() {
        let owner = fields.remove("owner").unwrap_or(Value::Null);
        fields.insert(
            "relationships".to_string(),
            json!({ "owner": { "identifier": owner } }),
        );
    }
}
