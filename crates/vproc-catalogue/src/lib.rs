//! Relational video catalogue.
//!
//! This crate provides:
//! - The [`VideoCatalogue`] seam used by the worker
//! - A PostgreSQL implementation ([`PgVideoCatalogue`])
//! - The updatable field whitelist ([`VideoField`])

pub mod config;
pub mod error;
pub mod field;
pub mod repository;

pub use config::CatalogueConfig;
pub use error::{CatalogueError, CatalogueResult};
pub use field::{FieldValue, VideoField};
pub use repository::{parse_page, PgVideoCatalogue, VideoCatalogue};
