//! The `noticeboard` library crate.
//!
//! A community noticeboard web API: posts, contact-form submissions, and
//! registered users stored in MongoDB, with authentication delegated to an
//! external OpenID Connect provider. The `noticeboard` binary composes the
//! server from these modules; the `migrate` binary drives [`migrations`].

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod migrations;
pub mod models;
pub mod routes;
