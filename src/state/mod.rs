//! Per-view client state.
//!
//! DESIGN
//! ======
//! State is split by view (`documents`, `upload`, `assistant`, `auth`,
//! `sidebar`) so each surface depends on a small focused model. Every model
//! is plain data plus methods; none of them own a runtime or a global.

pub mod assistant;
pub mod auth;
pub mod documents;
pub mod sidebar;
pub mod upload;
