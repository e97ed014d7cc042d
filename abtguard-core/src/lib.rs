//! Embeddable core library for abtguard.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking into another host
//! process.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`ArtifactSource`](ports::ArtifactSource): read backup bytes
//! - [`TableSource`](ports::TableSource): load the evidence and offset tables
//!
//! The [`adapters`] module provides filesystem-backed and in-memory implementations.
//!
//! # Entry points
//!
//! - [`run_inspect`](pipeline::run_inspect): decode and classify a backup
//! - [`run_assess`](pipeline::run_assess): assess a change request
//! - [`run_trust`](pipeline::run_trust): trust report over the rule table
//! - [`run_list_artifacts`](pipeline::run_list_artifacts): list backups in a directory

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-exported so embedders don't need the domain crate directly.
pub use abtguard_domain::{RuleMeta, builtin_rule_metas};
