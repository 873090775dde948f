//! Sift: hierarchical test discovery
//!
//! Resolves discovery selectors (containers, members, grouping paths, root
//! locations, stable identifiers) into one deduplicated test tree, with
//! dynamic descendant filters and effective execution metadata.

// Core infrastructure - re-exported from sift-core
pub use sift_core::config;
pub use sift_core::context;
pub use sift_core::error;
pub use sift_core::filter;
pub use sift_core::identifier;
pub use sift_core::inspector;
pub use sift_core::metadata;
pub use sift_core::output;
pub use sift_core::report;
pub use sift_core::resolve;
pub use sift_core::selector;
pub use sift_core::skip;
pub use sift_core::tree;
pub use sift_core::types;

// Front door
pub mod cli;
