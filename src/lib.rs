//! docphrase: phrasing lints and structure-preserving rewrites for
//! documentation comments.
//!
//! The engine lives in `docphrase-core`; this crate adds the built-in rule
//! catalog, the snapshot format hosts hand over, and unified diffs.

// Core engine - re-exported from docphrase-core
pub use docphrase_core::config;
pub use docphrase_core::entity;
pub use docphrase_core::error;
pub use docphrase_core::evaluate;
pub use docphrase_core::lexicon;
pub use docphrase_core::markup;
pub use docphrase_core::matcher;
pub use docphrase_core::output;
pub use docphrase_core::predicate;
pub use docphrase_core::rewrite;
pub use docphrase_core::rule;
pub use docphrase_core::scan;
pub use docphrase_core::span;
pub use docphrase_core::text;
pub use docphrase_core::tree;
pub use docphrase_core::walker;

pub mod catalog;
pub mod diff;
pub mod snapshot;
