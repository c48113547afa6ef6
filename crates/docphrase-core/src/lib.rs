//! Core engine for docphrase.
//!
//! This crate checks and rewrites structured documentation comments:
//! - Located comment trees with generation-stamped spans
//! - Tree walking into text tokens and logical text views
//! - Word-boundary phrase matching
//! - Lexical helpers (plurals, verb forms, articles)
//! - Declarative rules, entity predicates and rule evaluation
//! - Structure-preserving rewrites with minimal diffs
//! - A reference `///` XML markup adapter
//! - Parallel scanning, configuration, errors and JSON output

pub mod config;
pub mod entity;
pub mod error;
pub mod evaluate;
pub mod lexicon;
pub mod markup;
pub mod matcher;
pub mod output;
pub mod predicate;
pub mod rewrite;
pub mod rule;
pub mod scan;
pub mod span;
pub mod text;
pub mod tree;
pub mod walker;

pub use evaluate::{evaluate, EntityRef, EvalError, Finding, Proposal};
pub use rewrite::{apply, apply_batch, ReplacementMap, Rewrite, RewriteError, RewriteOp};
pub use rule::{Position, Rule, Severity};
pub use scan::{CancellationToken, ScanItem, Scanner};
