//!
//! # Data Access Layer
//!
//! One generic store drives every collection. [`collection`] holds the
//! static per-resource descriptors and the pure projection/reshaping
//! helpers; [`store`] holds the service that talks to the database.

pub mod collection;
pub mod store;

pub use collection::CollectionSpec;
pub use store::{Store, StoreSetupError};
