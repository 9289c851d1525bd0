//! Core pipeline and domain logic for jsondocgen.
//!
//! This crate merges parsed description markup with runtime facts, indexes the
//! port type hierarchy, assembles the filtered category tree, collects the
//! migration rules and renders the JSON artifacts, tied together by
//! [`pipeline::generate`].

pub mod hierarchy;
pub mod merge;
pub mod migrations;
pub mod pipeline;
pub mod render;
pub mod tree;

pub use hierarchy::{TypeHierarchy, TypeNode, TypeTree, color_hex, index_family};
pub use merge::{MergeMismatch, MergeOutcome, merge};
pub use migrations::extract_migration_rules;
pub use pipeline::{GenerateResult, ProgressReporter, SilentProgress, generate};
pub use render::{to_pretty_json, write_artifact, write_manifest};
pub use tree::{CategoryTreeBuilder, TreeFilters, TreeOutcome, normalize_category_path};
