//! Networking modules for the REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `http` wraps `reqwest` with bearer auth and status checking, `token`
//! persists the bearer credential, `api` binds the service endpoints, and
//! `types` defines the shared wire schema.

pub mod api;
pub mod http;
pub mod token;
pub mod types;
