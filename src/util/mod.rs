//! Utility helpers shared across views.
//!
//! SYSTEM CONTEXT
//! ==============
//! Formatting and file-type knowledge used by both the document list and the
//! upload flow lives here so the two never disagree about a MIME type.

pub mod files;
