//! Core types and services for the Marquee catalog.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::CatalogStore`] and [`store::UserStore`]; the
//! generic [`catalog::Catalog`] service layers validation, referential guards,
//! statistics and bulk ingestion on top of any backend.

pub mod actor;
pub mod bulk;
pub mod catalog;
pub mod director;
pub mod entity;
pub mod error;
pub mod genre;
pub mod media;
pub mod media_type;
pub mod producer;
pub mod query;
pub mod resource;
pub mod stats;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
