//! Core types and pure logic for the carbon ledger.
//!
//! This crate is deliberately free of HTTP and filesystem dependencies. It
//! owns the record shape, the emissions calculator, the aggregator, and the
//! [`Ledger`](ledger::Ledger) handle that sequences collection edits against
//! any [`RecordFileStore`](store::RecordFileStore) backend.

pub mod aggregate;
pub mod calc;
pub mod error;
pub mod insights;
pub mod ledger;
pub mod record;
pub mod store;

pub use error::{Error, Result};
