//! Configuration: where ledgers live and the user's settings

pub mod paths;
pub mod settings;

pub use paths::{validate_username, LedgerPaths};
pub use settings::Settings;
