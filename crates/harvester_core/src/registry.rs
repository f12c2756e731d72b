use std::collections::BTreeSet;

/// Deduplicating, append-only set of canonical item identifiers.
///
/// Identifiers are compared verbatim; canonicalization happens in the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemRegistry {
    items: BTreeSet<String>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Adds identifiers and returns how many were not already present.
    pub fn merge<I>(&mut self, identifiers: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = 0;
        for identifier in identifiers {
            if self.items.insert(identifier) {
                added += 1;
            }
        }
        added
    }

    /// Sorted copy of every identifier seen so far.
    pub fn snapshot(&self) -> Vec<String> {
        self.items.iter().cloned().collect()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.items.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn items(&self) -> &BTreeSet<String> {
        &self.items
    }
}
