//! Check-in service library.
//!
//! Issues signed, time-limited check-in codes for event participants,
//! verifies them at the door, and records each participant's first
//! verification in an idempotent ledger.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod identifier;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod roster;
pub mod scan;
pub mod shutdown;
pub mod storage;
pub mod token;

// Re-exports for convenience
pub use config::Config;
pub use error::{LedgerError, RosterError, ServiceError, TokenError};
pub use http::{create_app, AppState};
pub use ledger::{Ledger, ScanOutcome, VerificationRecord};
pub use token::TokenService;
