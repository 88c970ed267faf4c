//! Encrypted persistence codec
//!
//! Converts a ledger state to and from its at-rest form. Entry fields and
//! category labels go through the field cipher; budget amounts and the
//! recurrence schedule stay in cleartext. Decoding is per record: a record
//! that fails to decrypt or validate is reported and skipped while the
//! rest of the ledger loads.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::crypto::{decrypt_field, encrypt_field, FieldKey};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{LedgerState, TotalBudget, UniqueEntryCollection};
use crate::models::entry::{format_date, parse_date};
use crate::models::{CategoryBudget, LedgerEntry, Money, Recurrence};

/// Current at-rest format version
pub const FORMAT_VERSION: u32 = 1;

/// Plaintext of the verification token
const VERIFICATION_PLAINTEXT: &str = "budget-ledger";

/// A ledger entry with every field encrypted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedLedgerEntry {
    pub name: String,
    pub category: String,
    pub cost: String,
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Recorded before the last budget reset
    #[serde(default)]
    pub carried_over: bool,
}

impl EncryptedLedgerEntry {
    pub fn encrypt(entry: &LedgerEntry, key: &FieldKey) -> LedgerResult<Self> {
        Ok(Self {
            name: encrypt_field(entry.name(), key)?,
            category: encrypt_field(entry.category(), key)?,
            cost: encrypt_field(&entry.cost().to_plain_string(), key)?,
            date: encrypt_field(&format_date(entry.date()), key)?,
            tags: entry
                .tags()
                .iter()
                .map(|tag| encrypt_field(tag, key))
                .collect::<LedgerResult<_>>()?,
            carried_over: false,
        })
    }

    /// Decrypt and re-validate every field
    pub fn decrypt(&self, key: &FieldKey) -> LedgerResult<LedgerEntry> {
        let name = decrypt_field(&self.name, key)?;
        let category = decrypt_field(&self.category, key)?;
        let cost = Money::parse(&decrypt_field(&self.cost, key)?)?;
        let date = parse_date(&decrypt_field(&self.date, key)?)?;
        let tags = self
            .tags
            .iter()
            .map(|tag| decrypt_field(tag, key))
            .collect::<LedgerResult<Vec<_>>>()?;

        LedgerEntry::new(name, category, cost, date)?.with_tags(tags)
    }
}

/// A category budget with an encrypted label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCategoryBudget {
    pub category: String,
    pub cap: Money,
    pub spent: Money,
}

impl EncryptedCategoryBudget {
    pub fn encrypt(budget: &CategoryBudget, key: &FieldKey) -> LedgerResult<Self> {
        Ok(Self {
            category: encrypt_field(budget.category(), key)?,
            cap: budget.cap(),
            spent: budget.spent(),
        })
    }

    pub fn decrypt(&self, key: &FieldKey) -> LedgerResult<CategoryBudget> {
        let category = decrypt_field(&self.category, key)?;
        Ok(CategoryBudget::new(category, self.cap)?.with_spent(self.spent))
    }
}

/// The serializable at-rest form of a whole ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedLedgerState {
    pub version: u32,
    /// Encrypted constant, used to reject a wrong key up front
    pub verification: String,
    pub total_cap: Money,
    pub total_spent: Money,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub category_budgets: Vec<EncryptedCategoryBudget>,
    #[serde(default)]
    pub entries: Vec<EncryptedLedgerEntry>,
}

/// Which kind of record failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Entry,
    CategoryBudget,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::CategoryBudget => write!(f, "category budget"),
        }
    }
}

/// A record skipped during decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptRecordReport {
    pub kind: RecordKind,
    /// Position of the record in the stored list
    pub index: usize,
    pub reason: String,
}

impl CorruptRecordReport {
    fn new(kind: RecordKind, index: usize, err: &LedgerError) -> Self {
        Self {
            kind,
            index,
            reason: err.to_string(),
        }
    }

    pub fn into_error(self) -> LedgerError {
        LedgerError::CorruptRecord {
            record: format!("{} #{}", self.kind, self.index),
            reason: self.reason,
        }
    }
}

/// Result of decoding: the recovered ledger plus whatever could not be read
#[derive(Debug, Clone)]
pub struct DecodedLedger {
    pub ledger: LedgerState,
    pub corrupt_records: Vec<CorruptRecordReport>,
}

impl DecodedLedger {
    pub fn is_clean(&self) -> bool {
        self.corrupt_records.is_empty()
    }

    /// The ledger, or the first corrupt record as an error
    pub fn into_strict(self) -> LedgerResult<LedgerState> {
        match self.corrupt_records.into_iter().next() {
            Some(report) => Err(report.into_error()),
            None => Ok(self.ledger),
        }
    }
}

/// Encrypt a ledger state for storage
pub fn to_encrypted(state: &LedgerState, key: &FieldKey) -> LedgerResult<EncryptedLedgerState> {
    let budget = state.budget();

    let encoded = EncryptedLedgerState {
        version: FORMAT_VERSION,
        verification: encrypt_field(VERIFICATION_PLAINTEXT, key)?,
        total_cap: budget.cap(),
        total_spent: budget.spent(),
        recurrence: budget.recurrence().copied(),
        category_budgets: budget
            .category_budgets()
            .map(|b| EncryptedCategoryBudget::encrypt(b, key))
            .collect::<LedgerResult<_>>()?,
        entries: state
            .entries()
            .iter()
            .map(|e| {
                EncryptedLedgerEntry::encrypt(e, key).map(|mut record| {
                    record.carried_over = state.is_carried_over(e);
                    record
                })
            })
            .collect::<LedgerResult<_>>()?,
    };

    debug!(
        entries = encoded.entries.len(),
        categories = encoded.category_budgets.len(),
        "ledger encoded"
    );
    Ok(encoded)
}

/// Decrypt a stored ledger
///
/// A wrong key or unsupported version fails the whole decode. Individual
/// records that cannot be restored are collected in
/// [`DecodedLedger::corrupt_records`].
pub fn to_plain(encoded: &EncryptedLedgerState, key: &FieldKey) -> LedgerResult<DecodedLedger> {
    if encoded.version != FORMAT_VERSION {
        return Err(LedgerError::Storage(format!(
            "unsupported ledger format version {}",
            encoded.version
        )));
    }

    let token = decrypt_field(&encoded.verification, key)?;
    if token != VERIFICATION_PLAINTEXT {
        return Err(LedgerError::DecryptionFailure(
            "verification token mismatch".to_string(),
        ));
    }

    // Stored schedules bypass the constructor, so re-check the interval
    let recurrence = encoded
        .recurrence
        .map(|r| Recurrence::new(r.next(), r.interval_secs()))
        .transpose()?;

    let mut corrupt_records = Vec::new();

    let mut budget = TotalBudget::restore(
        encoded.total_cap,
        encoded.total_spent,
        recurrence,
        std::iter::empty::<CategoryBudget>(),
    )?;
    for (index, record) in encoded.category_budgets.iter().enumerate() {
        let restored = record
            .decrypt(key)
            .and_then(|category| budget.restore_category_budget(category));
        if let Err(err) = restored {
            warn!(index, error = %err, "skipping corrupt category budget");
            corrupt_records.push(CorruptRecordReport::new(RecordKind::CategoryBudget, index, &err));
        }
    }

    let mut entries = UniqueEntryCollection::new();
    let mut carried_over = Vec::new();
    for (index, record) in encoded.entries.iter().enumerate() {
        let restored = record.decrypt(key).and_then(|entry| {
            entries.add(entry.clone())?;
            Ok(entry)
        });
        match restored {
            Ok(entry) if record.carried_over => carried_over.push(entry),
            Ok(_) => {}
            Err(err) => {
                warn!(index, error = %err, "skipping corrupt entry");
                corrupt_records.push(CorruptRecordReport::new(RecordKind::Entry, index, &err));
            }
        }
    }

    debug!(
        entries = entries.len(),
        corrupt = corrupt_records.len(),
        "ledger decoded"
    );
    Ok(DecodedLedger {
        ledger: LedgerState::from_parts(entries, budget).with_carried_over(&carried_over),
        corrupt_records,
    })
}
