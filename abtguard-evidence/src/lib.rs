//! Evidence store for abtguard.
//!
//! The table is loaded once, validated as a whole, and read-only afterwards. Trust scoring is a
//! pure function of the cited ids and the table contents.

mod store;

pub use store::EvidenceStore;
