//! Document load bookkeeping.
//!
//! Loads are not cancellable once started. Instead every attempt is tagged
//! with a [`LoadToken`] from a monotonically increasing counter, and only the
//! completion carrying the latest token is accepted.

use std::fmt;
use std::io;

/// Caller-owned identifier of a document (path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentResource(String);

impl DocumentResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentResource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentResource {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A started load: the token to report back with and the resource to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub token: LoadToken,
    pub resource: DocumentResource,
}

#[derive(Debug, Default)]
pub struct LoadTracker {
    issued: u64,
    current: Option<LoadToken>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token, superseding any load still in flight.
    pub fn begin(&mut self) -> LoadToken {
        self.issued += 1;
        let token = LoadToken(self.issued);
        self.current = Some(token);
        token
    }

    fn is_current(&self, token: LoadToken) -> bool {
        self.current == Some(token)
    }

    /// Consumes `token` if it is the latest one. A token is accepted at most once.
    pub fn finish(&mut self, token: LoadToken) -> bool {
        if !self.is_current(token) {
            return false;
        }

        self.current = None;
        true
    }

    /// Forgets the in-flight load; its completion will be ignored.
    pub fn invalidate(&mut self) -> Option<LoadToken> {
        self.current.take()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {resource}: {source}")]
    Fetch {
        resource: DocumentResource,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {resource}: {message}")]
    Parse { resource: DocumentResource, message: String },
}

/// Resolves a resource to its page count.
///
/// Implementations may block; hosts run them off the event loop.
pub trait DocumentLoader {
    fn load_page_count(&self, resource: &DocumentResource) -> Result<u32, LoadError>;
}
