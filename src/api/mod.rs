//! HTTP surface for the access-control core.
//!
//! Request and response bodies live in this module; the framework glue is in
//! [`axum`].

mod types;

pub use types::*;

pub mod axum;
