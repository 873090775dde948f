//! Core infrastructure for sift.
//!
//! This crate provides the test-discovery resolution engine:
//! - Stable hierarchical identifiers and their string form
//! - Selectors and discovery requests
//! - The element inspector trait and a catalog-backed implementation
//! - The test tree, resolution context and resolver chain
//! - Dynamic descendant filters for runtime-produced nodes
//! - Execution metadata (parallelism mode, exclusive resources)
//! - Skip evaluation
//! - Configuration layering, error types and JSON output types

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod identifier;
pub mod inspector;
pub mod metadata;
pub mod output;
pub mod report;
pub mod resolve;
pub mod selector;
pub mod skip;
pub mod tree;
pub mod types;
