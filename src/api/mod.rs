//! HTTP API
//!
//! Thin axum handlers over [`crate::search::Catalog`] and
//! [`crate::resolver::Cascade`].

pub mod error;
pub mod handlers;
pub mod server;
pub mod stream;

pub use error::ApiError;
pub use server::{router, AppState, WebServer};
