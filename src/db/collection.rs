//!
//! # Collection Descriptors
//!
//! Each resource the API stores is described by a static [`CollectionSpec`]:
//! the collection name, the field records are addressed by, the fields a
//! keyword search matches against, and the fields returned to callers. The
//! descriptor is fixed at compile time; in particular the primary key of a
//! collection never changes once declared.
//!
//! The free functions in this module are the pure half of the data access
//! layer: they turn a descriptor into a storage-side projection, turn an
//! identifier into a primary-key filter, and turn a fetched BSON document
//! into the JSON shape the API responds with. None of them touch the
//! database.

use crate::error::ApiError;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use chrono::SecondsFormat;
use serde_json::Value;

/// Static description of one stored resource type.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    /// Collection name in the database.
    pub name: &'static str,
    /// Field records are addressed by. `_id` means the store-native
    /// identifier; anything else is a domain key (e.g. a user's email).
    pub primary_key: &'static str,
    /// Fields included in every response. `_id` is excluded unless listed.
    pub projected_fields: &'static [&'static str],
    /// Fields a keyword search OR-matches against.
    pub search_fields: &'static [&'static str],
}

/// Builds the storage projection for a descriptor.
///
/// Every projected field is included; `_id` is explicitly excluded when the
/// descriptor does not list it, since the database returns it by default.
pub fn projection_document(spec: &CollectionSpec) -> Document {
    let mut projection = Document::new();
    for field in spec.projected_fields {
        projection.insert(*field, true);
    }
    if !spec.projected_fields.contains(&"_id") {
        projection.insert("_id", false);
    }
    projection
}

/// Builds the filter addressing one record by its primary key.
///
/// A malformed identifier on an `_id`-keyed collection cannot address any
/// record, so it maps to the same 404 as a well-formed identifier with no
/// match.
pub fn primary_key_filter(spec: &CollectionSpec, identifier: &str) -> Result<Document, ApiError> {
    if spec.primary_key == "_id" {
        let object_id = ObjectId::parse_str(identifier).map_err(|_| ApiError::not_found())?;
        Ok(doc! { "_id": object_id })
    } else {
        let mut filter = Document::new();
        filter.insert(spec.primary_key, identifier);
        Ok(filter)
    }
}

/// Converts a fetched document into the JSON shape the API responds with.
///
/// Object ids become plain hex strings and timestamps become RFC 3339 UTC
/// strings; everything else keeps its natural JSON form. There is no error
/// path: any document the projection can produce is representable.
pub fn reshape_document(document: Document) -> Value {
    bson_to_json(Bson::Document(document))
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(object_id) => Value::String(object_id.to_hex()),
        Bson::DateTime(datetime) => Value::String(
            datetime
                .to_chrono()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        Bson::Document(document) => Value::Object(
            document
                .into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const BY_OBJECT_ID: CollectionSpec = CollectionSpec {
        name: "post",
        primary_key: "_id",
        projected_fields: &["_id", "message", "owner", "created_at", "updated_at"],
        search_fields: &["message"],
    };

    const BY_EMAIL: CollectionSpec = CollectionSpec {
        name: "user",
        primary_key: "email",
        projected_fields: &["first_name", "last_name", "email"],
        search_fields: &["first_name", "last_name", "email"],
    };

    #[test]
    fn test_projection_includes_listed_fields_only() {
        let projection = projection_document(&BY_OBJECT_ID);
        assert_eq!(
            projection,
            doc! {
                "_id": true,
                "message": true,
                "owner": true,
                "created_at": true,
                "updated_at": true,
            }
        );
    }

    #[test]
    fn test_projection_excludes_unlisted_native_id() {
        let projection = projection_document(&BY_EMAIL);
        assert_eq!(
            projection,
            doc! {
                "first_name": true,
                "last_name": true,
                "email": true,
                "_id": false,
            }
        );
    }

    #[test]
    fn test_primary_key_filter_parses_object_ids() {
        let filter = primary_key_filter(&BY_OBJECT_ID, "5f43825c66f4c0e20cd17dc3").unwrap();
        let object_id = ObjectId::parse_str("5f43825c66f4c0e20cd17dc3").unwrap();
        assert_eq!(filter, doc! { "_id": object_id });
    }

    #[test]
    fn test_malformed_object_id_is_not_found() {
        let error = primary_key_filter(&BY_OBJECT_ID, "not-a-hex-id").unwrap_err();
        assert_eq!(error, ApiError::not_found());
    }

    #[test]
    fn test_domain_primary_key_passes_through() {
        let filter = primary_key_filter(&BY_EMAIL, "mao_li_run@example.com").unwrap();
        assert_eq!(filter, doc! { "email": "mao_li_run@example.com" });
    }

    #[test]
    fn test_reshape_converts_ids_and_timestamps() {
        let object_id = ObjectId::parse_str("5f43825c66f4c0e20cd17dc3").unwrap();
        let moment = chrono::DateTime::parse_from_rfc3339("2020-10-05T16:00:12.000Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let document = doc! {
            "_id": object_id,
            "message": "What is quantum theory?",
            "counters": [Bson::Int32(3), Bson::Int64(9)],
            "created_at": bson::DateTime::from_chrono(moment),
            "nested": { "flag": true, "note": Bson::Null },
        };

        assert_eq!(
            reshape_document(document),
            json!({
                "_id": "5f43825c66f4c0e20cd17dc3",
                "message": "What is quantum theory?",
                "counters": [3, 9],
                "created_at": "2020-10-05T16:00:12.000Z",
                "nested": { "flag": true, "note": null },
            })
        );
    }
}
