//! # docdesk
//!
//! Typed client for the document-retrieval service: document listing and
//! deletion, sequential uploads, the retrieval assistant, and login/signup.
//!
//! This crate contains the HTTP wrapper and wire types (`net`), the keyed
//! response cache with polling (`query`), and the per-view state machines
//! (`state`). The `docdesk` binary drives them from the command line.

pub mod config;
pub mod error;
pub mod net;
pub mod notice;
pub mod query;
pub mod state;
pub mod util;

pub use config::ClientConfig;
pub use error::ApiError;
pub use net::http::ApiClient;
pub use net::token::TokenStore;
pub use query::QueryStore;
