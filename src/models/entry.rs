//! Ledger entry model
//!
//! An entry records a single spend: name, category, cost, date and tags.
//! Two entries are "the same entry" when name, category, cost and date
//! match, regardless of tags. Full equality (`==`) also compares tags.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

use super::money::Money;
use crate::error::{LedgerError, LedgerResult};

/// Textual date format used for entries, e.g. "01-02-2025"
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Validate an entry name: must contain a non-whitespace character
pub fn validate_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::invalid("name", name));
    }
    Ok(())
}

/// Validate a category label: alphanumeric first character, then alphanumerics or spaces
pub fn validate_category(category: &str) -> LedgerResult<()> {
    let mut chars = category.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphanumeric() => chars.all(|c| c.is_alphanumeric() || c == ' '),
        _ => false,
    };
    if !valid {
        return Err(LedgerError::invalid("category", category));
    }
    Ok(())
}

/// Validate a tag: non-empty and alphanumeric
pub fn validate_tag(tag: &str) -> LedgerResult<()> {
    if tag.is_empty() || !tag.chars().all(char::is_alphanumeric) {
        return Err(LedgerError::invalid("tag", tag));
    }
    Ok(())
}

/// Parse an entry date in `dd-mm-yyyy` form
pub fn parse_date(s: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| LedgerError::invalid("date", s))
}

/// Format an entry date in `dd-mm-yyyy` form
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The fields that decide whether two entries are duplicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryIdentity<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub cost: Money,
    pub date: NaiveDate,
}

/// A single recorded expense
///
/// Immutable once built; edits produce a new entry via [`EntryEdit::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    name: String,
    category: String,
    cost: Money,
    date: NaiveDate,
    tags: BTreeSet<String>,
}

impl LedgerEntry {
    /// Create an untagged entry, validating name and category
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        cost: Money,
        date: NaiveDate,
    ) -> LedgerResult<Self> {
        let name = name.into();
        let category = category.into();
        validate_name(&name)?;
        validate_category(&category)?;

        Ok(Self {
            name,
            category,
            cost,
            date,
            tags: BTreeSet::new(),
        })
    }

    /// Build an entry from its textual field forms
    pub fn parse<'t>(
        name: &str,
        category: &str,
        cost: &str,
        date: &str,
        tags: impl IntoIterator<Item = &'t str>,
    ) -> LedgerResult<Self> {
        Self::new(name, category, Money::parse(cost)?, parse_date(date)?)?.with_tags(tags)
    }

    /// Return a copy of this entry carrying the given tags
    pub fn with_tags<T: AsRef<str>>(mut self, tags: impl IntoIterator<Item = T>) -> LedgerResult<Self> {
        let mut set = BTreeSet::new();
        for tag in tags {
            let tag = tag.as_ref();
            validate_tag(tag)?;
            set.insert(tag.to_string());
        }
        self.tags = set;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn cost(&self) -> Money {
        self.cost
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// The duplicate-detection key of this entry
    pub fn identity(&self) -> EntryIdentity<'_> {
        EntryIdentity {
            name: &self.name,
            category: &self.category,
            cost: self.cost,
            date: self.date,
        }
    }

    /// Check whether `other` has the same identity (tags are ignored)
    pub fn is_same_entry(&self, other: &LedgerEntry) -> bool {
        self.identity() == other.identity()
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} on {}",
            self.name,
            self.category,
            self.cost,
            format_date(self.date)
        )
    }
}

/// Selects entries for find and mass-edit; every set criterion must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    name_keywords: Vec<String>,
    category: Option<String>,
    cost: Option<Money>,
    date: Option<NaiveDate>,
    tag: Option<String>,
}

impl EntryFilter {
    /// A filter matching every entry
    pub fn new() -> Self {
        Self::default()
    }

    /// Require each keyword to appear in the name (case-insensitive)
    pub fn name_keywords<T: AsRef<str>>(mut self, keywords: impl IntoIterator<Item = T>) -> Self {
        self.name_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    /// Require the category to match (case-insensitive)
    pub fn category(mut self, category: impl AsRef<str>) -> Self {
        self.category = Some(category.as_ref().to_lowercase());
        self
    }

    pub fn cost(mut self, cost: Money) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        let name = entry.name.to_lowercase();
        self.name_keywords.iter().all(|k| name.contains(k.as_str()))
            && self
                .category
                .as_ref()
                .map_or(true, |c| *c == entry.category.to_lowercase())
            && self.cost.map_or(true, |c| c == entry.cost)
            && self.date.map_or(true, |d| d == entry.date)
            && self.tag.as_ref().map_or(true, |t| entry.tags.contains(t))
    }
}

/// Field replacements applied to an entry; unset fields are kept
///
/// Values are validated when set, so applying an edit cannot fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryEdit {
    name: Option<String>,
    category: Option<String>,
    cost: Option<Money>,
    date: Option<NaiveDate>,
    tags: Option<BTreeSet<String>>,
}

impl EntryEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> LedgerResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        self.name = Some(name);
        Ok(self)
    }

    pub fn category(mut self, category: impl Into<String>) -> LedgerResult<Self> {
        let category = category.into();
        validate_category(&category)?;
        self.category = Some(category);
        Ok(self)
    }

    pub fn cost(mut self, cost: Money) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn tags<T: AsRef<str>>(mut self, tags: impl IntoIterator<Item = T>) -> LedgerResult<Self> {
        let mut set = BTreeSet::new();
        for tag in tags {
            validate_tag(tag.as_ref())?;
            set.insert(tag.as_ref().to_string());
        }
        self.tags = Some(set);
        Ok(self)
    }

    /// Check if this edit changes nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.cost.is_none()
            && self.date.is_none()
            && self.tags.is_none()
    }

    /// Produce the edited copy of `entry`
    pub fn apply(&self, entry: &LedgerEntry) -> LedgerEntry {
        LedgerEntry {
            name: self.name.clone().unwrap_or_else(|| entry.name.clone()),
            category: self.category.clone().unwrap_or_else(|| entry.category.clone()),
            cost: self.cost.unwrap_or(entry.cost),
            date: self.date.unwrap_or(entry.date),
            tags: self.tags.clone().unwrap_or_else(|| entry.tags.clone()),
        }
    }
}
