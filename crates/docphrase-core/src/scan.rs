//! Scanning many entities against a rule set, and fixing until stable.
//!
//! A [`Scanner`] owns the configured rules. [`Scanner::scan`] evaluates
//! entities in parallel and returns results in input order; a failure of
//! one `(entity, rule)` pair is recorded and never stops the scan.
//! [`Scanner::fix`] re-walks the comment after every applied fix, so later
//! proposals are always computed against the current generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::entity::SourceEntity;
use crate::evaluate::{evaluate, EntityRef, Finding};
use crate::rewrite::{apply, DiffEntry};
use crate::rule::{Position, Rule, StructuralCheck};
use crate::tree::CommentTree;

/// Cooperative cancellation, checked between entities.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One entity and its parsed comment.
#[derive(Debug, Clone)]
pub struct ScanItem {
    pub entity: SourceEntity,
    pub tree: CommentTree,
}

/// A rule that could not run for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub entity: EntityRef,
    pub rule_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Findings per entity, in input order.
    pub findings: Vec<Finding>,
    pub skipped: Vec<SkippedRule>,
    pub entities_checked: usize,
    pub cancelled: bool,
}

/// One applied fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixPass {
    pub rule_id: String,
    pub diff: Vec<DiffEntry>,
}

#[derive(Debug, Clone)]
pub struct FixOutcome {
    /// The comment after the last applied fix.
    pub tree: CommentTree,
    pub passes: Vec<FixPass>,
    /// Findings left on the final generation.
    pub remaining: Vec<Finding>,
    pub skipped: Vec<SkippedRule>,
}

impl FixOutcome {
    /// Every diff entry, earliest pass first.
    pub fn diffs(&self) -> impl Iterator<Item = &[DiffEntry]> {
        self.passes.iter().map(|p| p.diff.as_slice())
    }
}

/// A configured rule set.
#[derive(Debug, Clone)]
pub struct Scanner {
    rules: Vec<Rule>,
    max_fix_passes: usize,
}

impl Scanner {
    /// Apply `config` to `rules`: drop disabled ids, override severities and
    /// sentence limits.
    pub fn new(rules: Vec<Rule>, config: &ResolvedConfig) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| {
                let disabled = config.is_disabled(&rule.id);
                if disabled {
                    debug!(rule = %rule.id, "disabled by configuration");
                }
                !disabled
            })
            .map(|mut rule| {
                if let Some(severity) = config.severity_for(&rule.id) {
                    rule.severity = severity;
                }
                for spec in &mut rule.specs {
                    if let Position::Structural(StructuralCheck::SentenceLength { max_words, .. }) = &mut spec.position {
                        *max_words = config.max_sentence_words.value;
                    }
                }
                rule
            })
            .collect();
        Scanner {
            rules,
            max_fix_passes: config.max_fix_passes.value,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate every rule on one entity. Findings are ordered by span start,
    /// then rule order.
    pub fn check(&self, entity: &SourceEntity, tree: &CommentTree) -> (Vec<Finding>, Vec<SkippedRule>) {
        let mut findings = Vec::new();
        let mut skipped = Vec::new();
        for rule in &self.rules {
            match evaluate(rule, entity, tree) {
                Ok(found) => findings.extend(found),
                Err(error) => {
                    debug!(rule = %rule.id, entity = %entity.display_name(), %error, "rule skipped");
                    skipped.push(SkippedRule {
                        entity: EntityRef::from(entity),
                        rule_id: rule.id.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }
        findings.sort_by_key(|f| f.span.start);
        (findings, skipped)
    }

    /// Check all items in parallel. Output order follows input order.
    pub fn scan(&self, items: &[ScanItem], cancel: &CancellationToken) -> ScanReport {
        let results: Vec<Option<(Vec<Finding>, Vec<SkippedRule>)>> = items
            .par_iter()
            .map(|item| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.check(&item.entity, &item.tree))
            })
            .collect();

        let mut report = ScanReport::default();
        for result in results {
            match result {
                Some((findings, skipped)) => {
                    report.entities_checked += 1;
                    report.findings.extend(findings);
                    report.skipped.extend(skipped);
                }
                None => report.cancelled = true,
            }
        }
        debug!(
            entities = report.entities_checked,
            findings = report.findings.len(),
            cancelled = report.cancelled,
            "scan finished"
        );
        report
    }

    /// Apply fixes one at a time, re-evaluating on each new generation, until
    /// nothing fixable is left or the pass limit is reached.
    pub fn fix(&self, entity: &SourceEntity, tree: CommentTree) -> FixOutcome {
        let mut tree = tree;
        let mut passes = Vec::new();
        loop {
            let (findings, skipped) = self.check(entity, &tree);
            if passes.len() >= self.max_fix_passes {
                debug!(entity = %entity.display_name(), passes = passes.len(), "fix pass limit reached");
                return FixOutcome {
                    tree,
                    passes,
                    remaining: findings,
                    skipped,
                };
            }
            let applied = findings.iter().filter(|f| f.is_fixable()).find_map(|finding| {
                match apply(&tree, finding) {
                    Ok(rewrite) => Some((finding.rule_id.clone(), rewrite)),
                    Err(error) => {
                        debug!(rule = %finding.rule_id, %error, "fix rejected");
                        None
                    }
                }
            });
            match applied {
                Some((rule_id, rewrite)) => {
                    passes.push(FixPass {
                        rule_id,
                        diff: rewrite.diff,
                    });
                    tree = rewrite.tree;
                }
                None => {
                    return FixOutcome {
                        tree,
                        passes,
                        remaining: findings,
                        skipped,
                    }
                }
            }
        }
    }

    /// Fix every item independently, in parallel.
    pub fn fix_all(&self, items: Vec<ScanItem>, cancel: &CancellationToken) -> Vec<Option<FixOutcome>> {
        items
            .into_par_iter()
            .map(|item| (!cancel.is_cancelled()).then(|| self.fix(&item.entity, item.tree)))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
