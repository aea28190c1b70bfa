//! Where documents come from and where they go.
//!
//! Documents are addressed by their `/`-separated path relative to the site
//! root. [`FsSource`] and [`FsSink`] work on a directory; [`MemorySite`] keeps
//! everything in memory and implements both.

use std::{fmt, io};
use std::fmt::Debug;

use crate::dom::ParseError;
use crate::error::Result;

mod fs;
mod memory;

pub use fs::{FsSink, FsSource};
pub use memory::MemorySite;

/// A document's markup, as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub markup: String,
    pub relative_path: String,
}

#[derive(Debug)]
pub enum LoadError {
    NotFound(String),
    Io { id: String, error: io::Error },
    /// The bytes are not UTF-8.
    Parse { id: String, error: ParseError },
}

pub trait DocumentSource: Debug + Send + Sync {
    fn load(&self, id: &str) -> Result<Loaded, LoadError>;
}

pub trait DocumentSink: Debug + Send + Sync {
    /// Persists `markup` as document `id`. Returns `false` if the stored bytes
    /// already matched and nothing was written.
    fn store(&self, id: &str, markup: &str) -> Result<bool>;
}

impl LoadError {
    pub fn id(&self) -> &str {
        match self {
            LoadError::NotFound(id) => id,
            LoadError::Io { id, .. } | LoadError::Parse { id, .. } => id,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound(id) => write!(f, "{id}: document not found"),
            LoadError::Io { id, error } => write!(f, "{id}: {error}"),
            LoadError::Parse { id, error } => write!(f, "{id}: {error}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::NotFound(_) => None,
            LoadError::Io { error, .. } => Some(error),
            LoadError::Parse { error, .. } => Some(error),
        }
    }
}

/// Decodes `bytes` as the markup of document `id`.
pub(crate) fn decode(id: &str, bytes: Vec<u8>) -> Result<Loaded, LoadError> {
    use crate::dom::ParseErrorKind;

    match String::from_utf8(bytes) {
        Ok(markup) => Ok(Loaded { markup, relative_path: id.to_string() }),
        Err(e) => {
            let offset = e.utf8_error().valid_up_to();
            let error = ParseError::at(ParseErrorKind::InvalidUtf8, e.as_bytes(), offset);
            Err(LoadError::Parse { id: id.to_string(), error })
        }
    }
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn load(&self, id: &str) -> Result<Loaded, LoadError> {
        T::load(self, id)
    }
}

impl<T: DocumentSink + ?Sized> DocumentSink for &T {
    fn store(&self, id: &str, markup: &str) -> Result<bool> {
        T::store(self, id, markup)
    }
}
