//! Rewrite builder: turns proposals into structure-preserving tree edits.
//!
//! Every [`RewriteOp`] is first planned as a footprint in the coordinates of
//! the tree it was computed against: the byte range it replaces and the text
//! that lands there. Footprints are checked for conflicts, the structural
//! changes are applied back to front, and finally every span in the tree is
//! shifted into the coordinates of the rewritten buffer and stamped with the
//! next [`Generation`].
//!
//! Untouched bytes are never rewritten: the diff lists only the footprints.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::evaluate::Finding;
use crate::lexicon::match_case;
use crate::markup::{layout_node, render_node};
use crate::matcher::{find_matches, Comparison, PhraseMatch};
use crate::span::{ContentHash, Generation, TextSpan};
use crate::tree::{CommentNode, CommentTree, NodePath, TextRun};
use crate::walker::{text_tokens, TokenKind, WalkOptions};

/// Errors from applying rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("computed against {found}, tree is at {current}")]
    Stale { found: Generation, current: Generation },

    #[error("text under {span} changed since evaluation")]
    HashMismatch { span: TextSpan },

    #[error("edits overlap at byte {at}")]
    Conflict { at: usize },

    #[error("finding for {rule_id} has no proposal")]
    NoProposal { rule_id: String },

    #[error("no node at {path}")]
    NodeNotFound { path: NodePath },

    #[error("{span} is not inside a single text run")]
    SpanNotFound { span: TextSpan },

    #[error("node at {path} has no source span")]
    NodeWithoutSpan { path: NodePath },

    #[error("cannot insert at index {index} under {path}")]
    InvalidInsertIndex { path: NodePath, index: usize },

    #[error("text {text:?} cannot be placed in a single run")]
    InvalidText { text: String },
}

/// One primitive tree edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RewriteOp {
    /// Replace `span` (inside one text run) with `text`. `expected` is the hash
    /// of the text under `span` when the op was built.
    ReplaceTextRange {
        span: TextSpan,
        text: String,
        expected: ContentHash,
    },
    /// Replace the node at `path` with a freshly built node.
    ReplaceNode { path: NodePath, node: CommentNode },
    /// Insert a fresh node as child `index` of the element at `path`
    /// (the root path inserts a top-level node).
    InsertNode {
        path: NodePath,
        index: usize,
        node: CommentNode,
    },
    /// Remove the node at `path`. Removing a blank-line `"\n"` run also
    /// removes the exterior prefix of that line.
    RemoveNode { path: NodePath },
}

impl RewriteOp {
    /// Text replacement for `span`, hashing the text currently under it.
    pub fn replace_text(span: TextSpan, current: &str, text: impl Into<String>) -> Self {
        RewriteOp::ReplaceTextRange {
            span,
            text: text.into(),
            expected: ContentHash::compute(current),
        }
    }
}

/// One `(original span, replacement)` pair of a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub original: TextSpan,
    pub replacement: String,
}

/// A rewritten tree and the buffer edits that produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub tree: CommentTree,
    /// Sorted by original start.
    pub diff: Vec<DiffEntry>,
}

/// Result of applying several findings in one generation bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRewrite {
    pub rewrite: Rewrite,
    /// Indices of the findings whose proposals were applied.
    pub applied: Vec<usize>,
    /// Indices of rejected findings, with the reason.
    pub rejected: Vec<(usize, RewriteError)>,
}

// ============================================================================
// Planning
// ============================================================================

#[derive(Debug, Clone)]
enum Action {
    EditRun { path: NodePath, run_start: usize },
    Replace { path: NodePath, node: CommentNode },
    Insert { parent: NodePath, index: usize, node: CommentNode },
    Remove { parent: NodePath, first: usize, last: usize },
}

/// Footprint of one op in pre-rewrite coordinates.
#[derive(Debug, Clone)]
struct PlannedEdit {
    start: usize,
    end: usize,
    text: String,
    action: Action,
}

/// What [`shifted`] needs to know about an edit.
#[derive(Debug, Clone)]
struct Shift {
    start: usize,
    end: usize,
    len: usize,
    run: Option<NodePath>,
}

impl From<&PlannedEdit> for Shift {
    fn from(edit: &PlannedEdit) -> Self {
        let run = match &edit.action {
            Action::EditRun { path, .. } => Some(path.clone()),
            _ => None,
        };
        Shift {
            start: edit.start,
            end: edit.end,
            len: edit.text.len(),
            run,
        }
    }
}

/// Map a pre-rewrite offset to its post-rewrite offset.
///
/// Non-empty edits count when they end at or before `pos`. Insertions count
/// when strictly before `pos`; insertions exactly at `pos` count only when
/// `at_pos` says so.
fn shifted(shifts: &[Shift], pos: usize, at_pos: impl Fn(&Shift) -> bool) -> usize {
    let (mut added, mut removed) = (0, 0);
    for shift in shifts {
        let counts = if shift.start == shift.end {
            shift.start < pos || (shift.start == pos && at_pos(shift))
        } else {
            shift.end <= pos
        };
        if counts {
            added += shift.len;
            removed += shift.end - shift.start;
        }
    }
    pos + added - removed
}

fn check_fresh(node: &CommentNode) -> Result<(), RewriteError> {
    match node {
        CommentNode::Text(run) if run.text.contains('\n') && !run.is_newline() => Err(RewriteError::InvalidText {
            text: run.text.clone(),
        }),
        _ => Ok(()),
    }
}

/// First located, non-newline run whose span contains `span`.
fn locate_run<'a>(tree: &'a CommentTree, span: &TextSpan) -> Option<(NodePath, &'a TextRun, TextSpan)> {
    fn visit<'a>(
        nodes: &'a [CommentNode],
        path: &NodePath,
        span: &TextSpan,
    ) -> Option<(NodePath, &'a TextRun, TextSpan)> {
        for (index, node) in nodes.iter().enumerate() {
            match node {
                CommentNode::Text(run) if !run.is_newline() => {
                    if let Some(run_span) = run.span {
                        if run_span.start <= span.start && span.end() <= run_span.end() {
                            return Some((path.child(index), run, run_span));
                        }
                    }
                }
                CommentNode::Text(_) => {}
                CommentNode::Element(element) => {
                    if let Some(found) = visit(&element.children, &path.child(index), span) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    if span.buffer != tree.buffer {
        return None;
    }
    visit(&tree.nodes, &NodePath::root(), span)
}

fn plan_op(tree: &CommentTree, op: &RewriteOp) -> Result<PlannedEdit, RewriteError> {
    match op {
        RewriteOp::ReplaceTextRange { span, text, expected } => {
            if span.generation != tree.generation {
                return Err(RewriteError::Stale {
                    found: span.generation,
                    current: tree.generation,
                });
            }
            if text.contains('\n') {
                return Err(RewriteError::InvalidText { text: text.clone() });
            }
            let (path, run, run_span) = locate_run(tree, span).ok_or(RewriteError::SpanNotFound { span: *span })?;
            let local = span.start - run_span.start;
            let current = run
                .text
                .get(local..local + span.len)
                .ok_or(RewriteError::SpanNotFound { span: *span })?;
            if ContentHash::compute(current) != *expected {
                return Err(RewriteError::HashMismatch { span: *span });
            }
            Ok(PlannedEdit {
                start: span.start,
                end: span.end(),
                text: text.clone(),
                action: Action::EditRun {
                    path,
                    run_start: run_span.start,
                },
            })
        }
        RewriteOp::ReplaceNode { path, node } => {
            check_fresh(node)?;
            let old = tree
                .node_at(path)
                .ok_or_else(|| RewriteError::NodeNotFound { path: path.clone() })?;
            let span = old
                .span()
                .ok_or_else(|| RewriteError::NodeWithoutSpan { path: path.clone() })?;
            Ok(PlannedEdit {
                start: span.start,
                end: span.end(),
                text: render_node(node, &tree.line_prefix),
                action: Action::Replace {
                    path: path.clone(),
                    node: node.clone(),
                },
            })
        }
        RewriteOp::InsertNode { path, index, node } => {
            check_fresh(node)?;
            let at = insertion_point(tree, path, *index)?;
            Ok(PlannedEdit {
                start: at,
                end: at,
                text: render_node(node, &tree.line_prefix),
                action: Action::Insert {
                    parent: path.clone(),
                    index: *index,
                    node: node.clone(),
                },
            })
        }
        RewriteOp::RemoveNode { path } => plan_removal(tree, path),
    }
}

fn insertion_point(tree: &CommentTree, path: &NodePath, index: usize) -> Result<usize, RewriteError> {
    let invalid = || RewriteError::InvalidInsertIndex {
        path: path.clone(),
        index,
    };
    let without_span = || RewriteError::NodeWithoutSpan { path: path.clone() };
    let children = tree
        .children_at(path)
        .ok_or_else(|| RewriteError::NodeNotFound { path: path.clone() })?;
    let parent = tree.element_at(path);
    if parent.is_some_and(|e| e.self_closing) || index > children.len() {
        return Err(invalid());
    }
    if let Some(child) = children.get(index) {
        return child
            .span()
            .map(|s| s.start)
            .ok_or_else(|| RewriteError::NodeWithoutSpan { path: path.child(index) });
    }
    match parent {
        Some(element) => element.inner.map(|s| s.end()).ok_or_else(without_span),
        None => children
            .last()
            .and_then(CommentNode::span)
            .map(|s| s.end())
            .ok_or_else(without_span),
    }
}

fn plan_removal(tree: &CommentTree, path: &NodePath) -> Result<PlannedEdit, RewriteError> {
    let not_found = || RewriteError::NodeNotFound { path: path.clone() };
    let node = tree.node_at(path).ok_or_else(not_found)?;
    let span = node
        .span()
        .ok_or_else(|| RewriteError::NodeWithoutSpan { path: path.clone() })?;
    let parent = path.parent().ok_or_else(not_found)?;
    let index = path.last().ok_or_else(not_found)?;
    let siblings = tree.children_at(&parent).ok_or_else(not_found)?;

    let is_break = matches!(node, CommentNode::Text(run) if run.is_newline());
    if !is_break {
        return Ok(PlannedEdit {
            start: span.start,
            end: span.end(),
            text: String::new(),
            action: Action::Remove {
                parent,
                first: index,
                last: index,
            },
        });
    }

    // A blank line: only whitespace since the previous line break.
    let mut first = index;
    let mut previous_break = None;
    while first > 0 {
        match &siblings[first - 1] {
            CommentNode::Text(run) if run.is_newline() => {
                previous_break = run.span;
                break;
            }
            CommentNode::Text(run) if run.is_whitespace() => first -= 1,
            _ => break,
        }
    }
    if let Some(previous) = previous_break {
        return Ok(PlannedEdit {
            start: previous.end(),
            end: span.end(),
            text: String::new(),
            action: Action::Remove {
                parent,
                first,
                last: index,
            },
        });
    }

    // A lone line break joins its line with the next one.
    let following = siblings
        .get(index + 1)
        .and_then(CommentNode::span)
        .map(|s| s.start)
        .or_else(|| tree.element_at(&parent).and_then(|e| e.inner).map(|s| s.end()))
        .unwrap_or(span.end());
    Ok(PlannedEdit {
        start: span.start,
        end: following.max(span.end()),
        text: String::new(),
        action: Action::Remove {
            parent,
            first: index,
            last: index,
        },
    })
}

fn conflicts(a: (usize, usize), b: (usize, usize)) -> bool {
    match (a.0 == a.1, b.0 == b.1) {
        (true, true) => a.0 == b.0,
        (true, false) => b.0 < a.0 && a.0 < b.1,
        (false, true) => a.0 < b.0 && b.0 < a.1,
        (false, false) => a.0 < b.1 && b.0 < a.1,
    }
}

/// Reject overlapping footprints, two insertions at one point and
/// insertions strictly inside a replaced range.
fn check_conflicts(ranges: &[(usize, usize)]) -> Result<(), RewriteError> {
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            if conflicts(*a, *b) {
                return Err(RewriteError::Conflict { at: a.0.max(b.0) });
            }
        }
    }
    Ok(())
}

// ============================================================================
// Application
// ============================================================================

fn children_mut<'a>(nodes: &'a mut Vec<CommentNode>, path: &NodePath) -> Option<&'a mut Vec<CommentNode>> {
    let mut current = nodes;
    for index in &path.0 {
        current = match current.get_mut(*index)? {
            CommentNode::Element(element) => &mut element.children,
            CommentNode::Text(_) => return None,
        };
    }
    Some(current)
}

fn node_mut<'a>(nodes: &'a mut Vec<CommentNode>, path: &NodePath) -> Option<&'a mut CommentNode> {
    let (last, parent) = path.0.split_last()?;
    children_mut(nodes, &NodePath(parent.to_vec()))?.get_mut(*last)
}

fn remap(nodes: &mut [CommentNode], shifts: &[Shift], old: Generation, new: Generation) {
    for node in nodes {
        match node {
            CommentNode::Text(run) => {
                if let Some(span) = run.span.as_mut().filter(|s| s.generation == old) {
                    span.start = shifted(shifts, span.start, |_| true);
                    span.generation = new;
                }
            }
            CommentNode::Element(element) => {
                if let Some(span) = element.span.filter(|s| s.generation == old) {
                    element.span = Some(TextSpan::from_range(
                        span.buffer,
                        new,
                        shifted(shifts, span.start, |_| true),
                        shifted(shifts, span.end(), |_| false),
                    ));
                }
                if let Some(inner) = element.inner.filter(|s| s.generation == old) {
                    element.inner = Some(TextSpan::from_range(
                        inner.buffer,
                        new,
                        shifted(shifts, inner.start, |_| false),
                        shifted(shifts, inner.end(), |_| true),
                    ));
                }
                remap(&mut element.children, shifts, old, new);
            }
        }
    }
}

/// Apply ops computed against `tree`, producing the next generation.
///
/// All ops land in one generation bump; their footprints must not conflict.
pub fn apply_ops(tree: &CommentTree, ops: &[RewriteOp]) -> Result<Rewrite, RewriteError> {
    let mut edits = ops.iter().map(|op| plan_op(tree, op)).collect::<Result<Vec<_>, _>>()?;
    edits.sort_by_key(|e| (e.start, e.end));
    let ranges: Vec<(usize, usize)> = edits.iter().map(|e| (e.start, e.end)).collect();
    check_conflicts(&ranges)?;

    let old = tree.generation;
    let new = old.next();
    let buffer = tree.buffer;
    let prefix = tree.line_prefix.as_str();
    let shifts: Vec<Shift> = edits.iter().map(Shift::from).collect();
    let diff: Vec<DiffEntry> = edits
        .iter()
        .map(|e| DiffEntry {
            original: TextSpan::from_range(buffer, old, e.start, e.end),
            replacement: e.text.clone(),
        })
        .collect();

    let mut nodes = tree.nodes.clone();
    // Back to front, so earlier paths stay valid; at one offset, replacements
    // land before insertions.
    for edit in edits.into_iter().rev() {
        match edit.action {
            Action::EditRun { path, run_start } => {
                let Some(CommentNode::Text(run)) = node_mut(&mut nodes, &path) else {
                    return Err(RewriteError::NodeNotFound { path });
                };
                let local = edit.start - run_start;
                run.text.replace_range(local..local + (edit.end - edit.start), &edit.text);
                let start = shifted(&shifts, run_start, |s| s.run.as_ref() != Some(&path));
                run.span = Some(TextSpan::new(buffer, new, start, run.text.len()));
            }
            Action::Replace { path, node } => {
                let start = shifted(&shifts, edit.start, |_| true);
                let laid = layout_node(node, start, buffer, new, prefix);
                let slot = node_mut(&mut nodes, &path).ok_or(RewriteError::NodeNotFound { path })?;
                *slot = laid;
            }
            Action::Insert { parent, index, node } => {
                let start = shifted(&shifts, edit.start, |_| false);
                let laid = layout_node(node, start, buffer, new, prefix);
                let children = children_mut(&mut nodes, &parent).ok_or(RewriteError::NodeNotFound { path: parent })?;
                children.insert(index, laid);
            }
            Action::Remove { parent, first, last } => {
                let children = children_mut(&mut nodes, &parent)
                    .filter(|c| last < c.len())
                    .ok_or_else(|| RewriteError::NodeNotFound { path: parent.child(last) })?;
                children.drain(first..=last);
            }
        }
    }
    remap(&mut nodes, &shifts, old, new);

    Ok(Rewrite {
        tree: CommentTree {
            buffer,
            generation: new,
            line_prefix: tree.line_prefix.clone(),
            nodes,
        },
        diff,
    })
}

fn check_current(tree: &CommentTree, finding: &Finding) -> Result<(), RewriteError> {
    if finding.span.generation != tree.generation {
        return Err(RewriteError::Stale {
            found: finding.span.generation,
            current: tree.generation,
        });
    }
    Ok(())
}

/// Apply the proposal of one finding.
pub fn apply(tree: &CommentTree, finding: &Finding) -> Result<Rewrite, RewriteError> {
    check_current(tree, finding)?;
    let proposal = finding.proposal.as_ref().ok_or_else(|| RewriteError::NoProposal {
        rule_id: finding.rule_id.clone(),
    })?;
    apply_ops(tree, &proposal.ops)
}

/// Apply several findings in one generation bump.
///
/// Findings are accepted in order; stale ones, ones without a proposal and
/// ones whose edits conflict with an already accepted edit are rejected.
pub fn apply_batch(tree: &CommentTree, findings: &[Finding]) -> Result<BatchRewrite, RewriteError> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut ops = Vec::new();
    let mut applied = Vec::new();
    let mut rejected = Vec::new();

    for (index, finding) in findings.iter().enumerate() {
        let planned = check_current(tree, finding)
            .and_then(|()| {
                finding.proposal.as_ref().ok_or_else(|| RewriteError::NoProposal {
                    rule_id: finding.rule_id.clone(),
                })
            })
            .and_then(|proposal| {
                let footprints = proposal
                    .ops
                    .iter()
                    .map(|op| plan_op(tree, op).map(|e| (e.start, e.end)))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut combined = ranges.clone();
                combined.extend(footprints);
                check_conflicts(&combined)?;
                Ok((proposal, combined))
            });
        match planned {
            Ok((proposal, combined)) => {
                ranges = combined;
                ops.extend(proposal.ops.iter().cloned());
                applied.push(index);
            }
            Err(error) => {
                debug!(rule = %finding.rule_id, %error, "rejected finding in batch");
                rejected.push((index, error));
            }
        }
    }

    let rewrite = if ops.is_empty() {
        Rewrite {
            tree: tree.clone(),
            diff: Vec::new(),
        }
    } else {
        apply_ops(tree, &ops)?
    };
    Ok(BatchRewrite {
        rewrite,
        applied,
        rejected,
    })
}

/// Apply a diff to the buffer text it was computed against.
pub fn splice(source: &str, diff: &[DiffEntry]) -> String {
    let mut out = source.to_string();
    let mut entries: Vec<&DiffEntry> = diff.iter().collect();
    entries.sort_by_key(|e| std::cmp::Reverse((e.original.start, e.original.end())));
    for entry in entries {
        let end = entry.original.end().min(out.len());
        let start = entry.original.start.min(end);
        out.replace_range(start..end, &entry.replacement);
    }
    out
}

// ============================================================================
// Replacement Maps
// ============================================================================

/// Ordered `(phrase, replacement)` pairs applied by located spans.
///
/// Pairs are sorted by descending phrase length, then lexically, so the
/// longest phrase wins at every position. Replaced text is never rescanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementMap {
    pairs: Vec<(String, String)>,
    comparison: Comparison,
}

impl ReplacementMap {
    pub fn new<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
        comparison: Comparison,
    ) -> Self {
        let mut pairs: Vec<(String, String)> = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        ReplacementMap { pairs, comparison }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn phrases(&self) -> Vec<&str> {
        self.pairs.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Replacement for a found phrase, with its capitalization copied under
    /// [`Comparison::IgnoreCase`].
    pub fn lookup(&self, found: &str) -> Option<String> {
        let (_, value) = self.pairs.iter().find(|(k, _)| match self.comparison {
            Comparison::Ordinal => k == found,
            Comparison::IgnoreCase => k.to_lowercase() == found.to_lowercase(),
        })?;
        Some(match self.comparison {
            Comparison::Ordinal => value.clone(),
            Comparison::IgnoreCase => match_case(found, value),
        })
    }

    /// Non-overlapping hits in `text`.
    pub fn find(&self, text: &str) -> Vec<PhraseMatch> {
        find_matches(text, &self.phrases(), self.comparison)
    }

    /// Replace every hit in `text` in one pass.
    pub fn apply_str(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for hit in self.find(text) {
            out.push_str(&text[last..hit.start]);
            let found = &text[hit.start..hit.end];
            out.push_str(&self.lookup(found).unwrap_or_else(|| found.to_string()));
            last = hit.end;
        }
        out.push_str(&text[last..]);
        out
    }

    /// Text edits replacing every hit in the tree's text runs.
    pub fn ops_for(&self, tree: &CommentTree, options: WalkOptions) -> Vec<RewriteOp> {
        let mut ops = Vec::new();
        for token in text_tokens(tree, options).filter(|t| t.kind == TokenKind::Text) {
            for hit in self.find(token.text) {
                let found = &token.text[hit.start..hit.end];
                if let Some(value) = self.lookup(found) {
                    ops.push(RewriteOp::replace_text(token.span.sub(hit.start, hit.len()), found, value));
                }
            }
        }
        ops
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::evaluate::{EntityRef, Proposal};
    use crate::markup::parse_doc_comment;
    use crate::rule::Severity;
    use crate::span::BufferId;
    use crate::tree::{Element, TagKind};
    use crate::walker::plain_text;

    const SOURCE: &str = "/// <summary>\n/// Checks whether the file exists.\n/// </summary>";

    fn parse(source: &str) -> CommentTree {
        parse_doc_comment(source, 0, BufferId(0)).unwrap()
    }

    /// Every located node of `tree` must slice `source` to its own text.
    fn assert_spans_match(tree: &CommentTree, source: &str) {
        fn visit(nodes: &[CommentNode], source: &str, prefix: &str) {
            for node in nodes {
                let span = node.span().unwrap();
                match node {
                    CommentNode::Text(run) => assert_eq!(span.slice(source), Some(run.text.as_str()), "{}", span),
                    CommentNode::Element(_) => {
                        assert_eq!(span.slice(source), Some(render_node(node, prefix).as_str()), "{}", span)
                    }
                }
                visit(node.children(), source, prefix);
            }
        }
        visit(&tree.nodes, source, &tree.line_prefix);
    }

    fn finding(span: TextSpan, ops: Vec<RewriteOp>) -> Finding {
        Finding {
            entity: EntityRef {
                kind: EntityKind::Method,
                name: "Exists".to_string(),
                containing_type: None,
            },
            rule_id: "T0001".to_string(),
            severity: Severity::Warning,
            span,
            path: NodePath(vec![0]),
            message: "test".to_string(),
            proposal: Some(Proposal {
                preview: String::new(),
                ops,
            }),
        }
    }

    fn checks_span(tree: &CommentTree) -> TextSpan {
        TextSpan::new(tree.buffer, tree.generation, 18, 6)
    }

    mod text_edit_tests {
        use super::*;

        #[test]
        fn replaces_exact_range_inside_run() {
            let tree = parse(SOURCE);
            let op = RewriteOp::replace_text(checks_span(&tree), "Checks", "Determines");
            let rewrite = apply_ops(&tree, &[op]).unwrap();
            let source = splice(SOURCE, &rewrite.diff);
            assert_eq!(source, "/// <summary>\n/// Determines whether the file exists.\n/// </summary>");
            assert_eq!(rewrite.tree.generation, Generation(1));
            assert_eq!(plain_text(&rewrite.tree.nodes[0]), "Determines whether the file exists.");
            assert_spans_match(&rewrite.tree, &source);
            assert_eq!(rewrite.diff.len(), 1);
            assert_eq!(rewrite.diff[0].original.start, 18);
        }

        #[test]
        fn several_edits_in_one_run() {
            let source = "/// <summary>Use e.g. red, i.e. blue.</summary>";
            let tree = parse(source);
            let map = ReplacementMap::new([("e.g.", "for example"), ("i.e.", "for example")], Comparison::Ordinal);
            let ops = map.ops_for(&tree, WalkOptions::prose());
            assert_eq!(ops.len(), 2);
            let rewrite = apply_ops(&tree, &ops).unwrap();
            let rewritten = splice(source, &rewrite.diff);
            assert_eq!(rewritten, "/// <summary>Use for example red, for example blue.</summary>");
            assert_spans_match(&rewrite.tree, &rewritten);
        }

        #[test]
        fn stale_span_is_rejected() {
            let tree = parse(SOURCE);
            let span = checks_span(&tree).with_generation(Generation(1));
            let err = apply_ops(&tree, &[RewriteOp::replace_text(span, "Checks", "X")]).unwrap_err();
            assert!(matches!(err, RewriteError::Stale { .. }));
        }

        #[test]
        fn changed_text_is_rejected() {
            let tree = parse(SOURCE);
            let op = RewriteOp::replace_text(checks_span(&tree), "Tests!", "Determines");
            assert!(matches!(apply_ops(&tree, &[op]), Err(RewriteError::HashMismatch { .. })));
        }

        #[test]
        fn span_across_runs_is_rejected() {
            let tree = parse(SOURCE);
            let span = TextSpan::new(tree.buffer, tree.generation, 10, 10);
            let op = RewriteOp::replace_text(span, "", "x");
            assert!(matches!(apply_ops(&tree, &[op]), Err(RewriteError::SpanNotFound { .. })));
        }

        #[test]
        fn newline_in_text_is_rejected() {
            let tree = parse(SOURCE);
            let op = RewriteOp::replace_text(checks_span(&tree), "Checks", "a\nb");
            assert!(matches!(apply_ops(&tree, &[op]), Err(RewriteError::InvalidText { .. })));
        }

        #[test]
        fn overlapping_edits_conflict() {
            let tree = parse(SOURCE);
            let first = RewriteOp::replace_text(checks_span(&tree), "Checks", "A");
            let second = RewriteOp::replace_text(checks_span(&tree).sub(2, 4), "ecks", "B");
            assert!(matches!(apply_ops(&tree, &[first, second]), Err(RewriteError::Conflict { at: 20 })));
        }
    }

    mod node_tests {
        use super::*;

        #[test]
        fn replace_node_renders_with_line_prefix() {
            let tree = parse(SOURCE);
            let node: CommentNode = Element::new(TagKind::Summary).with_text("\nDetermines it.\n").into();
            let rewrite = apply_ops(&tree, &[RewriteOp::ReplaceNode { path: NodePath(vec![0]), node }]).unwrap();
            let source = splice(SOURCE, &rewrite.diff);
            assert_eq!(source, "/// <summary>\n/// Determines it.\n/// </summary>");
            assert_spans_match(&rewrite.tree, &source);
            assert_eq!(rewrite.tree.nodes[0].children().len(), 3);
        }

        #[test]
        fn insert_node_shifts_following_spans() {
            let tree = parse(SOURCE);
            let node: CommentNode = Element::new(TagKind::C).with_text("x").into();
            let op = RewriteOp::InsertNode {
                path: NodePath(vec![0]),
                index: 1,
                node,
            };
            let rewrite = apply_ops(&tree, &[op]).unwrap();
            let source = splice(SOURCE, &rewrite.diff);
            assert_eq!(source, "/// <summary>\n/// <c>x</c>Checks whether the file exists.\n/// </summary>");
            assert_spans_match(&rewrite.tree, &source);
            let summary = rewrite.tree.nodes[0].as_element().unwrap();
            assert_eq!(summary.inner.unwrap().start, 13);
        }

        #[test]
        fn append_at_element_end() {
            let tree = parse(SOURCE);
            let op = RewriteOp::InsertNode {
                path: NodePath(vec![0]),
                index: 3,
                node: Element::new(TagKind::Para).with_text("More.").into(),
            };
            let rewrite = apply_ops(&tree, &[op]).unwrap();
            let source = splice(SOURCE, &rewrite.diff);
            assert!(source.ends_with("/// <para>More.</para></summary>"));
            assert_spans_match(&rewrite.tree, &source);
        }

        #[test]
        fn two_insertions_at_one_point_conflict() {
            let tree = parse(SOURCE);
            let insert = |text: &str| RewriteOp::InsertNode {
                path: NodePath(vec![0]),
                index: 1,
                node: CommentNode::text(text),
            };
            assert!(matches!(
                apply_ops(&tree, &[insert("a"), insert("b")]),
                Err(RewriteError::Conflict { .. })
            ));
        }

        #[test]
        fn insert_index_past_end_is_rejected() {
            let tree = parse(SOURCE);
            let op = RewriteOp::InsertNode {
                path: NodePath(vec![0]),
                index: 9,
                node: CommentNode::text("a"),
            };
            assert!(matches!(apply_ops(&tree, &[op]), Err(RewriteError::InvalidInsertIndex { index: 9, .. })));
        }

        #[test]
        fn removing_blank_line_removes_its_prefix() {
            let source = "/// <summary>\n/// First.\n///\n/// Second.\n/// </summary>";
            let tree = parse(source);
            let rewrite = apply_ops(&tree, &[RewriteOp::RemoveNode { path: NodePath(vec![0, 3]) }]).unwrap();
            let rewritten = splice(source, &rewrite.diff);
            assert_eq!(rewritten, "/// <summary>\n/// First.\n/// Second.\n/// </summary>");
            assert_eq!(rewrite.tree.nodes[0].children().len(), 5);
            assert_spans_match(&rewrite.tree, &rewritten);
        }

        #[test]
        fn missing_node_is_reported() {
            let tree = parse(SOURCE);
            let op = RewriteOp::RemoveNode { path: NodePath(vec![4]) };
            assert!(matches!(apply_ops(&tree, &[op]), Err(RewriteError::NodeNotFound { .. })));
        }
    }

    mod finding_tests {
        use super::*;

        #[test]
        fn applying_twice_is_stale() {
            let tree = parse(SOURCE);
            let f = finding(
                checks_span(&tree),
                vec![RewriteOp::replace_text(checks_span(&tree), "Checks", "Determines")],
            );
            let rewrite = apply(&tree, &f).unwrap();
            assert!(matches!(apply(&rewrite.tree, &f), Err(RewriteError::Stale { .. })));
        }

        #[test]
        fn finding_without_proposal() {
            let tree = parse(SOURCE);
            let mut f = finding(checks_span(&tree), Vec::new());
            f.proposal = None;
            assert!(matches!(apply(&tree, &f), Err(RewriteError::NoProposal { .. })));
        }

        #[test]
        fn batch_rejects_overlapping_findings() {
            let tree = parse(SOURCE);
            let span = checks_span(&tree);
            let first = finding(span, vec![RewriteOp::replace_text(span, "Checks", "Determines")]);
            let second = finding(span, vec![RewriteOp::replace_text(span.sub(0, 3), "Che", "X")]);
            let file = TextSpan::new(tree.buffer, tree.generation, 37, 4);
            let third = finding(file, vec![RewriteOp::replace_text(file, "file", "path")]);
            let batch = apply_batch(&tree, &[first, second, third]).unwrap();
            assert_eq!(batch.applied, vec![0, 2]);
            assert_eq!(batch.rejected.len(), 1);
            assert_eq!(batch.rejected[0].0, 1);
            let source = splice(SOURCE, &batch.rewrite.diff);
            assert_eq!(source, "/// <summary>\n/// Determines whether the path exists.\n/// </summary>");
            assert_spans_match(&batch.rewrite.tree, &source);
        }
    }

    mod replacement_map_tests {
        use super::*;

        #[test]
        fn pairs_sort_longest_first() {
            let map = ReplacementMap::new([("eg", "e.g."), ("i.e.", "that is"), ("e.g.", "for example")], Comparison::Ordinal);
            assert_eq!(map.phrases(), vec!["e.g.", "i.e.", "eg"]);
        }

        #[test]
        fn replaces_without_cascading() {
            let map = ReplacementMap::new([("e.g.", "for example"), ("eg", "e.g.")], Comparison::Ordinal);
            assert_eq!(map.apply_str("eg red"), "e.g. red");
            assert_eq!(map.apply_str("e.g. red, i.e. blue"), "for example red, i.e. blue");
        }

        #[test]
        fn abbreviations_become_for_example() {
            let map = ReplacementMap::new([("e.g.", "for example"), ("i.e.", "for example")], Comparison::Ordinal);
            assert_eq!(map.apply_str("e.g. red"), "for example red");
            assert_eq!(map.apply_str("e.g. red, i.e. blue"), "for example red, for example blue");
        }

        #[test]
        fn ignore_case_copies_capitalization() {
            let map = ReplacementMap::new([("e.g.", "for example")], Comparison::IgnoreCase);
            assert_eq!(map.apply_str("E.g. this"), "For example this");
        }

        #[test]
        fn words_inside_words_are_left_alone() {
            let map = ReplacementMap::new([("eg", "e.g.")], Comparison::Ordinal);
            assert_eq!(map.apply_str("legs"), "legs");
        }
    }
}
