//! Token holder: the one piece of persisted client state.
//!
//! Consulted by the sync driver (login frame) and the REST client
//! (`Authorization` header).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::TokenError;

pub trait TokenHolder: Send + Sync {
    /// Current token, `None` when logged out.
    fn get(&self) -> Option<String>;

    fn set(&self, token: &str) -> Result<(), TokenError>;

    fn clear(&self) -> Result<(), TokenError>;
}

/// Placeholders that mean "no token".
fn normalize(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty() || token == "undefined" || token == "null" {
        None
    } else {
        Some(token.to_string())
    }
}

/// Token kept in a single file.
#[derive(Debug)]
pub struct FileTokenHolder {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileTokenHolder {
    /// Open the holder at `path`, loading any token already there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TokenError> {
        let path = path.into();
        let cached = match fs::read_to_string(&path) {
            Ok(text) => normalize(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => return Err(TokenError::Io { path, source }),
        };
        debug!("Token file {} loaded (present: {})", path.display(), cached.is_some());

        Ok(FileTokenHolder {
            path,
            cached: RwLock::new(cached),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenError {
        TokenError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenHolder for FileTokenHolder {
    fn get(&self) -> Option<String> {
        self.cached.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, token: &str) -> Result<(), TokenError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        fs::write(&self.path, token).map_err(|e| self.io_error(e))?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = normalize(token);
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(self.io_error(e)),
        }
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// In-memory token, for tests and one-shot commands.
#[derive(Debug, Default)]
pub struct MemoryTokenHolder(RwLock<Option<String>>);

impl MemoryTokenHolder {
    pub fn new(token: Option<&str>) -> Self {
        MemoryTokenHolder(RwLock::new(token.and_then(normalize)))
    }
}

impl TokenHolder for MemoryTokenHolder {
    fn get(&self) -> Option<String> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, token: &str) -> Result<(), TokenError> {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = normalize(token);
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenError> {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
