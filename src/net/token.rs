//! Bearer token persistence.
//!
//! DESIGN
//! ======
//! The token lives in memory behind an `Arc<RwLock<..>>` so every clone of
//! the client sees a login immediately, and is mirrored to a file so the next
//! process starts authenticated.

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ApiError;

#[derive(Clone, Debug, Default)]
pub struct TokenStore {
    token: Arc<RwLock<Option<String>>>,
    path: Option<PathBuf>,
}

impl TokenStore {
    /// Token store that never touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store, reading any token already saved at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let token = match std::fs::read_to_string(&path) {
            Ok(raw) => Some(raw.trim().to_owned()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), loaded = token.is_some(), "token store opened");
        Ok(Self { token: Arc::new(RwLock::new(token)), path: Some(path) })
    }

    /// Seed the in-memory token without persisting it (e.g. from a CLI flag).
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
        self
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Store `token` in memory and, for file-backed stores, on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file cannot be written.
    pub fn set(&self, token: &str) -> Result<(), ApiError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, token)?;
        }
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    /// Forget the token. A missing token file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing token file cannot be removed.
    pub fn clear(&self) -> Result<(), ApiError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
