//! Core types and the dispatch layer for the Roster back office.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! owns the entity schemas, payload validation, the filter / paginate engine
//! and the generic CRUD [`service::Service`]; storage backends implement
//! [`store::EntityStore`].

pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod payload;
pub mod query;
pub mod resource;
pub mod schema;
pub mod service;
pub mod store;
pub mod timestamp;
pub mod value;

pub use error::{Error, FieldErrors, Result};
pub use resource::ResourceKind;
pub use value::{Gender, Record, Value};
