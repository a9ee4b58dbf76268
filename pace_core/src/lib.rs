#![forbid(unsafe_code)]

//! Core domain model and business logic for the quitpace interval tracker.
//!
//! This crate provides:
//! - Domain types (users, smoking events, availability)
//! - Interval rules and the per-act state machine
//! - Undo and the nightly growth sweep
//! - Storage contracts with in-memory and file backends
//! - Session state for alternative tasks and pings
//! - Report derivations and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod rules;
pub mod store;
pub mod wal;
pub mod state;
pub mod onboarding;
pub mod engine;
pub mod undo;
pub mod progression;
pub mod session;
pub mod history;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result, UndoRefusal};
pub use types::*;
pub use config::Config;
pub use store::{EventStore, MemoryEventStore, MemoryUserStore, UserStore};
pub use wal::JsonlEventLog;
pub use state::{DataDirLock, JsonUserStore};
pub use onboarding::{initialize_user, reset_user};
pub use engine::{check_availability, register_event};
pub use undo::undo_last;
pub use progression::{run_growth_sweep, SweepReport};
pub use session::{complete_alternative, smoke_now, AlternativeOutcome, SessionState, SmokeOutcome};
pub use export::export_events_csv;
