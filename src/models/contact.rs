use crate::db::CollectionSpec;
use bson::{doc, Document};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Storage descriptor for contact-form submissions. Contacts are written by
/// the public site and read back as a report, most recent first.
pub const CONTACT_COLLECTION: CollectionSpec = CollectionSpec {
    name: "contact",
    primary_key: "_id",
    projected_fields: &[
        "_id",
        "first_name",
        "last_name",
        "email",
        "message",
        "created_at",
        "updated_at",
    ],
    search_fields: &["first_name", "last_name", "email", "message"],
};

/// Input structure for a contact-form submission.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ContactInput {
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50))]
    pub last_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 10, max = 500))]
    pub message: String,
}

impl ContactInput {
    pub fn document(&self) -> Document {
        doc! {
            "first_name": &self.first_name,
            "last_name": &self.last_name,
            "email": &self.email,
            "message": &self.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactInput {
        ContactInput {
            first_name: "Prasert".to_string(),
            last_name: "Sangsorn".to_string(),
            email: "prasert_sangsorn@example.com".to_string(),
            message: "Could you add a dark theme to the noticeboard?".to_string(),
        }
    }

    #[test]
    fn test_contact_validation() {
        assert!(submission().validate().is_ok());

        let bad_email = ContactInput {
            email: "not-an-address".to_string(),
            ..submission()
        };
        assert!(bad_email.validate().is_err());

        let short_message = ContactInput {
            message: "Hi".to_string(),
            ..submission()
        };
        assert!(short_message.validate().is_err());
    }
}
