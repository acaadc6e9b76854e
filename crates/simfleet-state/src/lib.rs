//! simfleet-state — persisted instance state for simfleet.
//!
//! A single JSON file records every instance the provisioning collaborator
//! has created: its identity, API endpoint, the last snapshot taken from it
//! and whether it was stopped. The file outlives any one orchestrator run
//! and is the source of truth for instance existence.
//!
//! # Layout
//!
//! ```text
//! {
//!   "instances": {
//!     "<id>": { "id": ..., "apiUrl": ..., "snapshotId": ..., "stoppedAt": ... }
//!   },
//!   "updatedAt": "2026-01-01T00:00:00.000Z"
//! }
//! ```
//!
//! # Concurrency
//!
//! Every mutating call is a read-modify-write of the whole file with no
//! locking. Two orchestrators writing the same file at once can lose
//! updates; run one fleet at a time per state file.

pub mod error;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{load, save, StateStore};
pub use types::*;
