//! Ordered entry collection with identity uniqueness
//!
//! No two entries in the collection share an identity (see
//! [`LedgerEntry::is_same_entry`]). Insertion order is kept for display.

use std::collections::HashMap;

use crate::error::{LedgerError, LedgerResult};
use crate::models::LedgerEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueEntryCollection {
    entries: Vec<LedgerEntry>,
}

impl UniqueEntryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting input that contains duplicate identities
    pub fn from_entries(entries: Vec<LedgerEntry>) -> LedgerResult<Self> {
        let mut collection = Self::new();
        collection.set_all(entries)?;
        Ok(collection)
    }

    /// Check if an entry with the same identity is present
    pub fn contains(&self, entry: &LedgerEntry) -> bool {
        self.position(entry).is_some()
    }

    fn position(&self, entry: &LedgerEntry) -> Option<usize> {
        self.entries.iter().position(|e| e.is_same_entry(entry))
    }

    /// Append an entry
    pub fn add(&mut self, entry: LedgerEntry) -> LedgerResult<()> {
        if self.contains(&entry) {
            return Err(LedgerError::DuplicateEntry(entry.to_string()));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Replace `target` in place, returning the entry that was replaced
    ///
    /// `replacement` may share `target`'s identity (e.g. a tag-only edit),
    /// but not the identity of any other entry.
    pub fn replace(
        &mut self,
        target: &LedgerEntry,
        replacement: LedgerEntry,
    ) -> LedgerResult<LedgerEntry> {
        let index = self
            .position(target)
            .ok_or_else(|| LedgerError::EntryNotFound(target.to_string()))?;

        let collides = self
            .entries
            .iter()
            .enumerate()
            .any(|(i, e)| i != index && e.is_same_entry(&replacement));
        if collides {
            return Err(LedgerError::DuplicateEntry(replacement.to_string()));
        }

        Ok(std::mem::replace(&mut self.entries[index], replacement))
    }

    /// Remove the entry with `entry`'s identity, returning the stored entry
    pub fn remove(&mut self, entry: &LedgerEntry) -> LedgerResult<LedgerEntry> {
        let index = self
            .position(entry)
            .ok_or_else(|| LedgerError::EntryNotFound(entry.to_string()))?;
        Ok(self.entries.remove(index))
    }

    /// Replace the whole contents; the collection is untouched on error
    pub fn set_all(&mut self, entries: Vec<LedgerEntry>) -> LedgerResult<()> {
        if let Some((first, second)) = find_duplicate(&entries) {
            return Err(LedgerError::DuplicateEntry(format!(
                "{} collides with {}",
                entries[second], entries[first]
            )));
        }
        self.entries = entries;
        Ok(())
    }

    pub fn as_slice(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LedgerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Indices of the first pair of entries sharing an identity
fn find_duplicate(entries: &[LedgerEntry]) -> Option<(usize, usize)> {
    let mut seen = HashMap::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if let Some(&first) = seen.get(&entry.identity()) {
            return Some((first, i));
        }
        seen.insert(entry.identity(), i);
    }
    None
}

impl<'a> IntoIterator for &'a UniqueEntryCollection {
    type Item = &'a LedgerEntry;
    type IntoIter = std::slice::Iter<'a, LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
