use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::AdvanceError;

/// Reveals the next slice of content in a live source session.
///
/// The harvest loop owns the advancer exclusively for the whole run and never calls it
/// concurrently.
#[async_trait::async_trait]
pub trait Advancer: Send {
    /// Acquire the session and land on the first page.
    async fn open(&mut self) -> Result<(), AdvanceError> {
        Ok(())
    }

    /// Move one step forward. `Ok` means new content is ready to extract.
    async fn advance(&mut self) -> Result<(), AdvanceError>;

    /// Release the session. Called once on every exit path.
    async fn close(&mut self) {}
}

/// Reads canonical item identifiers out of whatever the source currently shows.
///
/// An empty set is a valid answer: the page simply had nothing on it.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self) -> BTreeSet<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub html: String,
}

/// The most recently fetched page, shared between an advancer and its extractors.
#[derive(Debug, Clone, Default)]
pub struct PageBuffer {
    inner: Arc<Mutex<Option<Page>>>,
}

impl PageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, page: Page) {
        *self.lock() = Some(page);
    }

    pub fn current(&self) -> Option<Page> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Page>> {
        // Writes replace the whole value, so a poisoned lock still holds a consistent page.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
