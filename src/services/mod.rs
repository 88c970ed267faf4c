//! Service layer
//!
//! The session facade on top of the ledger engine and storage, plus the
//! clock it reads time from.

pub mod clock;
pub mod session;

pub use clock::{Clock, FixedClock, SystemClock};
pub use session::{LedgerChange, LedgerObserver, LedgerSession};
