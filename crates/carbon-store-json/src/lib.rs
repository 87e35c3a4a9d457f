//! JSON file backend for the carbon ledger.
//!
//! The whole collection lives in one pretty-printed JSON array. Every save
//! writes a synced temp file beside the target, backs up the previous
//! version, and renames the temp file into place.

mod paths;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{JsonFileStore, StagedWrite};
