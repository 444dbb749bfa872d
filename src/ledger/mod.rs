// src/ledger/mod.rs

//! Durable build-status ledger.
//!
//! Builds are identified by a [`BuildId`] and tracked as small marker files
//! inside a status directory, one file per build:
//!
//! ```text
//! {unix_timestamp}-{pid}-{status}    status in {building, failed, aborted}
//! current-build-id                   plain-text id of the most recent build
//! ```
//!
//! Success is represented by the **absence** of any status file for an id.
//! External viewers poll or watch this directory and key on file absence, so
//! no explicit "succeeded" status exists.

pub mod id;
pub mod store;

pub use id::{BuildId, BuildStatus};
pub use store::{BuildLedger, BuildRecord, CURRENT_BUILD_ID_FILE};
