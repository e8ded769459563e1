pub mod authorization;
pub mod contact;
pub mod pagination;
pub mod post;
pub mod user;

pub use pagination::{Links, ListQuery, Meta, Page};
