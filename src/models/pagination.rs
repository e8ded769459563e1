//!
//! # Pagination Models
//!
//! Every list endpoint accepts the same [`ListQuery`] parameters and answers
//! with a [`Page`]: the matching records plus navigation links and counters
//! derived from the request URL.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

lazy_static! {
    static ref KEYWORD_TOO_LONG: ValidationError = ValidationError::new("keyword_too_long");
    static ref KEYWORD_NOT_A_PATTERN: ValidationError = ValidationError::new("keyword_not_a_pattern");
}

fn default_page() -> u64 {
    1
}

fn default_records_per_page() -> u64 {
    10
}

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    /// 1-based page number.
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u64,
    /// Records returned per page.
    #[serde(default = "default_records_per_page")]
    #[validate(range(min = 1))]
    pub records_per_page: u64,
    /// Optional search pattern matched against the collection's searchable
    /// fields.
    #[validate(custom = "validate_keyword")]
    pub keyword: Option<String>,
}

/// The keyword is handed to the database as a regular expression, so reject
/// patterns the engine would not accept before they leave the process.
fn validate_keyword(keyword: &str) -> Result<(), ValidationError> {
    if keyword.len() > 100 {
        return Err(KEYWORD_TOO_LONG.clone());
    }
    if regex::Regex::new(keyword).is_err() {
        return Err(KEYWORD_NOT_A_PATTERN.clone());
    }
    Ok(())
}

/// Navigation links for a page of records.
///
/// `previous_page` and `next_page` are null at the matching boundary;
/// `first_page` and `last_page` always address a real page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Links {
    pub first_page: String,
    pub last_page: String,
    pub previous_page: Option<String>,
    pub next_page: Option<String>,
}

/// Counters describing where a page sits in the full result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub current_page: u64,
    pub last_page: u64,
    pub total_records: u64,
    pub records_per_page: u64,
    pub url: String,
}

/// One page of records with its navigation links and counters.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page {
    pub data: Vec<Value>,
    pub links: Links,
    pub meta: Meta,
}

impl Page {
    /// Assembles a page from fetched records and the query that produced
    /// them.
    ///
    /// `url` is the request URL without its query string; links reattach the
    /// pagination parameters to it. The last page is 1 even when nothing
    /// matched, so the boundary links always point somewhere.
    pub fn new(
        data: Vec<Value>,
        url: &str,
        page: u64,
        records_per_page: u64,
        total_records: u64,
    ) -> Self {
        let last_page = if total_records > 0 {
            total_records.div_ceil(records_per_page)
        } else {
            1
        };
        let link =
            |target: u64| format!("{}?page={}&records_per_page={}", url, target, records_per_page);

        Page {
            data,
            links: Links {
                first_page: link(1),
                last_page: link(last_page),
                previous_page: (page > 1).then(|| link(page - 1)),
                next_page: (page < last_page).then(|| link(page + 1)),
            },
            meta: Meta {
                current_page: page,
                last_page,
                total_records,
                records_per_page,
                url: url.to_string(),
            },
        }
    }
}
