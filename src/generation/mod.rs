//! HTTP surface of the document pipeline.
//!
//! - `service` - template fill, save and bounded PDF conversion
//! - `handlers` - actix-web handlers and error mapping
//! - `cleanup` - background deletion of old outputs

pub mod cleanup;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;

pub use service::{DocumentService, GeneratedDocument, ServiceError};
