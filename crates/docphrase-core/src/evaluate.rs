//! Rule evaluator: one rule, one entity, one comment in; findings out.
//!
//! [`evaluate`] is a pure function. The rule's applicability predicate is
//! checked against entity metadata first; then every [`PhraseSpec`] of the
//! rule is run against its scope element, and each violation becomes a
//! [`Finding`] located in the tree's current generation. Where the rule's
//! strategy allows it, a finding carries a [`Proposal`]: the ops that fix it
//! and a preview of the corrected element text.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::entity::{EntityKind, SourceEntity};
use crate::lexicon::{
    base_form, capitalize, conjugate_third_person_singular, decapitalize, is_acronym, is_adjective_or_adverb,
    is_function_word, is_gerund, is_identifier, is_past_tense, is_third_person_singular_verb, match_case,
};
use crate::matcher::{contains_any, ends_with_any, find_matches, match_at, trim_range, Comparison};
use crate::rewrite::{apply_ops, ReplacementMap, RewriteOp};
use crate::rule::{
    expand_template, Cardinality, PhraseSpec, Position, RewriteStrategy, Rule, Severity, StructuralCheck,
    TemplateContext,
};
use crate::span::TextSpan;
use crate::tree::{CommentNode, CommentTree, Element, NodePath, TagKind, TextRun};
use crate::walker::{
    element_tokens, first_element, named_element, plain_text, Segment, SegmentSource, TextToken, TextView,
    TokenKind, WalkOptions,
};

/// Errors that stop one rule for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("rule {rule}: malformed comment: {message}")]
    MalformedComment { rule: String, message: String },
}

/// The entity a finding belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containing_type: Option<String>,
}

impl From<&SourceEntity> for EntityRef {
    fn from(entity: &SourceEntity) -> Self {
        EntityRef {
            kind: entity.kind,
            name: entity.name.clone(),
            containing_type: entity.containing_type.clone(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.containing_type {
            Some(containing) => write!(f, "{} {}.{}", self.kind, containing, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// A proposed fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Plain text of the inspected element after the fix.
    pub preview: String,
    pub ops: Vec<RewriteOp>,
}

/// One rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub entity: EntityRef,
    pub rule_id: String,
    pub severity: Severity,
    /// Offending text, valid against the generation it was computed from.
    pub span: TextSpan,
    /// Path of the inspected (scope) element.
    pub path: NodePath,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<Proposal>,
}

impl Finding {
    pub fn is_fixable(&self) -> bool {
        self.proposal.is_some()
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Evaluate `rule` against one entity's comment.
///
/// Inapplicable rules (predicate false, required tag or scope element
/// missing) yield no findings. Findings are ordered by span start; findings
/// of earlier specs come first on ties.
pub fn evaluate(rule: &Rule, entity: &SourceEntity, tree: &CommentTree) -> Result<Vec<Finding>, EvalError> {
    if !rule.applicability.matches(entity) {
        trace!(rule = %rule.id, entity = %entity.display_name(), "not applicable");
        return Ok(Vec::new());
    }
    if let Some(tag) = rule.requires.iter().find(|tag| first_element(tree, **tag).is_none()) {
        trace!(rule = %rule.id, %tag, "required tag missing");
        return Ok(Vec::new());
    }

    let mut findings = Vec::new();
    for spec in &rule.specs {
        let Some((path, element)) = scope_element(tree, spec.scope, entity) else {
            trace!(rule = %rule.id, scope = %spec.scope, "scope element missing");
            continue;
        };
        let span = match element.span {
            Some(span) if span.generation == tree.generation && span.buffer == tree.buffer => span,
            Some(span) => {
                return Err(EvalError::MalformedComment {
                    rule: rule.id.clone(),
                    message: format!("<{}> at {} is located in {}", element.name, path, span.generation),
                })
            }
            None => {
                return Err(EvalError::MalformedComment {
                    rule: rule.id.clone(),
                    message: format!("<{}> at {} has no span", element.name, path),
                })
            }
        };
        let check = Check::new(rule, entity, tree, spec, path, element, span);
        findings.extend(check.run());
    }
    findings.sort_by_key(|f| f.span.start);
    trace!(rule = %rule.id, entity = %entity.display_name(), count = findings.len(), "evaluated");
    Ok(findings)
}

fn scope_element<'t>(tree: &'t CommentTree, scope: TagKind, entity: &SourceEntity) -> Option<(NodePath, &'t Element)> {
    if entity.kind == EntityKind::Parameter && matches!(scope, TagKind::Param | TagKind::TypeParam) {
        return named_element(tree, scope, &entity.name);
    }
    first_element(tree, scope)
}

// ============================================================================
// Helpers
// ============================================================================

/// Skip leading ignorable words (`Asynchronously`, `Recursively`, ...).
///
/// Returns the offset of the first remaining word and whether anything was skipped.
fn skip_prefixes(text: &str, mut pos: usize, prefixes: &[String]) -> (usize, bool) {
    let mut stripped = false;
    while let Some(end) = prefixes
        .iter()
        .find_map(|p| match_at(text, pos, p.trim_end(), Comparison::IgnoreCase))
    {
        if end == pos {
            break;
        }
        pos = end + (text[end..].len() - text[end..].trim_start().len());
        stripped = true;
    }
    (pos, stripped)
}

fn same_text(a: &str, b: &str, comparison: Comparison) -> bool {
    match comparison {
        Comparison::Ordinal => a == b,
        Comparison::IgnoreCase => a.to_lowercase() == b.to_lowercase(),
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Word without trailing punctuation.
fn bare_word(word: &str) -> &str {
    word.trim_end_matches(|c: char| c.is_ascii_punctuation())
}

/// Start of the match of `key` that ends exactly at the end of `text`.
fn tail_match(text: &str, key: &str, comparison: Comparison) -> Option<usize> {
    text.char_indices()
        .rev()
        .map(|(i, _)| i)
        .find(|i| match_at(text, *i, key, comparison) == Some(text.len()))
}

/// Buffer offset of logical offset `logical` inside `segment`.
fn segment_offset(segment: &Segment, logical: usize, at_start: bool) -> Option<usize> {
    match &segment.source {
        SegmentSource::Run { span, .. } => Some(span.start + (logical - segment.start)),
        SegmentSource::Break { span: Some(span), .. } | SegmentSource::Opaque { span: Some(span), .. } => {
            Some(if at_start { span.start } else { span.end() })
        }
        _ => None,
    }
}

/// `(logical start, logical end)` of every sentence in `text`.
fn sentences(text: &str, delimiters: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !delimiters.contains(c) {
            continue;
        }
        if chars.peek().is_none_or(|(_, next)| next.is_whitespace()) {
            let end = i + c.len_utf8();
            out.push((start, end));
            start = end;
        }
    }
    if !text[start..].trim().is_empty() {
        out.push((start, text.len()));
    }
    out
}

/// Copy of `element` without excluded block children (inline ones stay).
fn without_blocks(element: &Element, exclude: &[TagKind]) -> Element {
    let children = element
        .children
        .iter()
        .filter(|c| !matches!(c, CommentNode::Element(e) if exclude.contains(&e.tag) && !e.tag.is_inline()))
        .map(|c| match c {
            CommentNode::Element(e) => CommentNode::Element(without_blocks(e, exclude)),
            other => other.clone(),
        })
        .collect();
    Element {
        children,
        ..element.clone()
    }
}

fn is_break(node: &CommentNode) -> bool {
    matches!(node, CommentNode::Text(run) if run.is_newline())
}

/// First non-whitespace node of a line, when it is a `- ` / `* ` bulleted run.
fn bullet_run(line: &[CommentNode]) -> Option<(usize, &TextRun)> {
    let index = line
        .iter()
        .position(|n| !matches!(n, CommentNode::Text(run) if run.is_whitespace()))?;
    let run = line[index].as_text()?;
    let trimmed = run.text.trim_start();
    (trimmed.starts_with("- ") || trimmed.starts_with("* ")).then_some((index, run))
}

fn bullet_item(line: &[CommentNode]) -> Option<CommentNode> {
    let (index, run) = bullet_run(line)?;
    let rest = run.text.trim_start()[2..].trim_start();
    let mut description = Element::new(TagKind::Description);
    if !rest.is_empty() {
        description = description.with_text(rest);
    }
    for node in &line[index + 1..] {
        description = description.with_child(node.clone());
    }
    Some(Element::new(TagKind::Item).with_child(description.into()).into())
}

fn bullet_list(items: Vec<CommentNode>) -> CommentNode {
    let mut list = Element::new(TagKind::List).with_attribute("type", "bullet");
    for item in items {
        list = list.with_text("\n").with_child(item);
    }
    list.with_text("\n").into()
}

/// One located violation before it becomes a finding.
struct Hit {
    span: TextSpan,
    found: String,
    op: Option<RewriteOp>,
}

// ============================================================================
// Checks
// ============================================================================

/// One spec applied to its scope element.
struct Check<'a> {
    rule: &'a Rule,
    entity: &'a SourceEntity,
    tree: &'a CommentTree,
    spec: &'a PhraseSpec,
    path: NodePath,
    element: &'a Element,
    span: TextSpan,
    candidates: Vec<String>,
}

impl<'a> Check<'a> {
    fn new(
        rule: &'a Rule,
        entity: &'a SourceEntity,
        tree: &'a CommentTree,
        spec: &'a PhraseSpec,
        path: NodePath,
        element: &'a Element,
        span: TextSpan,
    ) -> Self {
        let ctx = TemplateContext::new(entity);
        let candidates = spec
            .candidate_templates()
            .iter()
            .map(|t| expand_template(t, &ctx))
            .filter(|c| !c.is_empty())
            .collect();
        Check {
            rule,
            entity,
            tree,
            spec,
            path,
            element,
            span,
            candidates,
        }
    }

    fn run(&self) -> Vec<Finding> {
        match &self.spec.position {
            Position::StartsWith => self.starts_with(),
            Position::EndsWith => self.ends_with(),
            Position::Contains => self.contains(),
            Position::None => self.forbidden(),
            Position::Equals => self.equals(),
            Position::Structural(check) => match check {
                StructuralCheck::SentenceLength { max_words, delimiters } => {
                    self.sentence_length(*max_words, delimiters)
                }
                StructuralCheck::BlankLine => self.blank_lines(),
                StructuralCheck::ManualList => self.manual_list(),
                StructuralCheck::Empty => self.empty(),
                StructuralCheck::ThirdPersonVerb => self.third_person_verb(),
            },
        }
    }

    fn view(&self) -> TextView {
        TextView::of_element(self.element, self.path.clone())
    }

    fn replacement_map(&self) -> ReplacementMap {
        let ctx = TemplateContext::new(self.entity);
        ReplacementMap::new(
            self.spec
                .replacements
                .iter()
                .map(|(k, v)| (expand_template(k, &ctx), expand_template(v, &ctx))),
            self.spec.comparison,
        )
    }

    fn tokens(&self) -> Vec<TextToken<'a>> {
        element_tokens(self.tree, &self.path, WalkOptions::excluding(&self.spec.exclude))
            .map(|tokens| tokens.filter(|t| t.kind == TokenKind::Text).collect())
            .unwrap_or_default()
    }

    /// Buffer span of the logical range `[start, end)` of `view`, falling
    /// back to the scope element's span.
    fn logical_span(&self, view: &TextView, start: usize, end: usize) -> TextSpan {
        if let Some(span) = view.span_of(start, end.saturating_sub(start)) {
            return span;
        }
        let overlapping = || view.segments().iter().filter(move |s| s.start < end && start < s.end());
        let first = overlapping().find_map(|s| segment_offset(s, start.max(s.start), true));
        let last = overlapping().rev().find_map(|s| segment_offset(s, end.min(s.end()), false));
        match (first, last) {
            (Some(a), Some(b)) if a <= b => TextSpan::from_range(self.tree.buffer, self.tree.generation, a, b),
            _ => self.span,
        }
    }

    fn finding(&self, span: TextSpan, found: &str, ops: Option<Vec<RewriteOp>>) -> Finding {
        let phrase = self.candidates.first().map(String::as_str).unwrap_or("");
        let ctx = TemplateContext::new(self.entity).with_phrase(phrase).with_found(found);
        let ops = match self.rule.strategy {
            RewriteStrategy::ReportOnly => None,
            RewriteStrategy::RemoveElement => Some(vec![RewriteOp::RemoveNode {
                path: self.path.clone(),
            }]),
            RewriteStrategy::Auto => ops.filter(|ops| !ops.is_empty()),
        };
        Finding {
            entity: EntityRef::from(self.entity),
            rule_id: self.rule.id.clone(),
            severity: self.rule.severity,
            span,
            path: self.path.clone(),
            message: expand_template(&self.rule.message, &ctx),
            proposal: ops.and_then(|ops| self.proposal(ops)),
        }
    }

    fn proposal(&self, ops: Vec<RewriteOp>) -> Option<Proposal> {
        match apply_ops(self.tree, &ops) {
            Ok(rewrite) => {
                let removed = ops
                    .iter()
                    .any(|op| matches!(op, RewriteOp::RemoveNode { path } if *path == self.path));
                let preview = if removed {
                    String::new()
                } else {
                    rewrite.tree.node_at(&self.path).map(plain_text).unwrap_or_default()
                };
                Some(Proposal { preview, ops })
            }
            Err(error) => {
                debug!(rule = %self.rule.id, %error, "dropping proposal that does not apply");
                None
            }
        }
    }

    /// Findings for `hits` per the spec's cardinality. With `combine`, the
    /// single `First` finding carries the ops of every hit.
    fn report(&self, hits: Vec<Hit>, combine: bool) -> Vec<Finding> {
        match self.spec.cardinality {
            Cardinality::All => hits
                .into_iter()
                .map(|hit| self.finding(hit.span, &hit.found, hit.op.map(|op| vec![op])))
                .collect(),
            Cardinality::First => {
                let Some(first) = hits.first() else {
                    return Vec::new();
                };
                let ops = if combine {
                    let ops: Vec<RewriteOp> = hits.iter().filter_map(|h| h.op.clone()).collect();
                    (ops.len() == hits.len()).then_some(ops)
                } else {
                    first.op.clone().map(|op| vec![op])
                };
                vec![self.finding(first.span, &first.found, ops)]
            }
        }
    }

    // ------------------------------------------------------------------------
    // Phrase positions
    // ------------------------------------------------------------------------

    fn starts_with(&self) -> Vec<Finding> {
        let view = self.view();
        let text = view.text();
        let (pos, stripped) = skip_prefixes(text, view.content_start(), &self.spec.ignorable_prefixes);
        if pos >= view.content_end() {
            return Vec::new();
        }
        let comparison = self.spec.comparison;
        let matches = self.candidates.iter().any(|c| {
            match_at(text, pos, c, comparison).is_some()
                || (stripped
                    && [decapitalize(c), capitalize(c)]
                        .iter()
                        .any(|v| match_at(text, pos, v, comparison).is_some()))
        });
        if matches {
            return Vec::new();
        }

        let words = view.words();
        let index = words.iter().position(|(s, _)| *s >= pos);
        let (start, word) = match index {
            Some(i) => words[i],
            None => return Vec::new(),
        };
        let span = self.logical_span(&view, start, start + word.len());
        let ops = self.starts_with_fix(&view, pos, stripped, &words, index);
        vec![self.finding(span, word, ops)]
    }

    fn starts_with_fix(
        &self,
        view: &TextView,
        pos: usize,
        stripped: bool,
        words: &[(usize, &str)],
        index: Option<usize>,
    ) -> Option<Vec<RewriteOp>> {
        let text = view.text();
        let adjust = |s: &str| if stripped { decapitalize(s) } else { s.to_string() };

        // A known wrong opening is swapped for its replacement.
        for (key, value) in self.replacement_map().pairs() {
            if let Some(end) = match_at(text, pos, key, self.spec.comparison) {
                if let Some(span) = view.span_of(pos, end - pos) {
                    return Some(vec![RewriteOp::replace_text(span, &text[pos..end], adjust(value))]);
                }
            }
        }

        let candidate = self.candidates.first()?;
        let mut lead = adjust(candidate);
        if !lead.ends_with(char::is_whitespace) {
            lead.push(' ');
        }

        if let Some(i) = index {
            let (start, word) = words[i];
            if let Some(span) = view.span_of(start, word.len()) {
                let mut parts = candidate.split_whitespace();
                let head = parts.next()?;
                let tail: Vec<&str> = parts.collect();
                let following = &words[i + 1..];
                let aligned = !tail.is_empty()
                    && following.len() >= tail.len()
                    && tail
                        .iter()
                        .zip(following)
                        .all(|(t, (_, w))| t.to_lowercase() == w.to_lowercase());
                if aligned {
                    return Some(vec![RewriteOp::replace_text(span, word, adjust(head))]);
                }
                let lowered = if is_identifier(word) || is_acronym(word) {
                    word.to_string()
                } else {
                    decapitalize(word)
                };
                return Some(vec![RewriteOp::replace_text(span, word, format!("{}{}", lead, lowered))]);
            }
        }

        match &view.segment_at(pos)?.source {
            SegmentSource::Run { .. } => {
                let span = view.span_of(pos, 0)?;
                Some(vec![RewriteOp::replace_text(span, "", lead)])
            }
            SegmentSource::Opaque { path, .. } => Some(vec![RewriteOp::InsertNode {
                path: path.parent()?,
                index: path.last()?,
                node: CommentNode::text(lead),
            }]),
            SegmentSource::Break { .. } => None,
        }
    }

    fn ends_with(&self) -> Vec<Finding> {
        let view = self.view();
        let text = view.text();
        let end = view.content_end();
        if view.content_start() >= end {
            return Vec::new();
        }
        if ends_with_any(&text[..end], &self.candidates, self.spec.comparison).is_some() {
            return Vec::new();
        }
        let words = view.words();
        let Some(&(start, word)) = words.last() else {
            return Vec::new();
        };
        let span = self.logical_span(&view, start, start + word.len());
        let ops = self.ends_with_fix(&view, end);
        vec![self.finding(span, word, ops)]
    }

    fn ends_with_fix(&self, view: &TextView, end: usize) -> Option<Vec<RewriteOp>> {
        let body = &view.text()[..end];
        for (key, value) in self.replacement_map().pairs() {
            if let Some(from) = tail_match(body, key, self.spec.comparison) {
                if let Some(span) = view.span_of(from, end - from) {
                    return Some(vec![RewriteOp::replace_text(span, &body[from..], value.clone())]);
                }
            }
        }

        let candidate = self.candidates.first()?;
        if let Some(span) = view.span_of(end, 0) {
            return Some(vec![RewriteOp::replace_text(span, "", candidate.clone())]);
        }
        // The text ends inside an inline element: append after it.
        let last = view.segments().iter().rev().find(|s| s.start < end)?;
        match &last.source {
            SegmentSource::Opaque { path, .. } => Some(vec![RewriteOp::InsertNode {
                path: path.parent()?,
                index: path.last()? + 1,
                node: CommentNode::text(candidate.clone()),
            }]),
            _ => None,
        }
    }

    fn contains(&self) -> Vec<Finding> {
        let tokens = self.tokens();
        let comparison = self.spec.comparison;
        let found = tokens
            .iter()
            .any(|t| contains_any(t.text, &self.candidates, comparison).is_some())
            || contains_any(&collapse(self.view().text()), &self.candidates, comparison).is_some();
        if found {
            return Vec::new();
        }
        let (span, text) = tokens
            .first()
            .map(|t| (t.span, t.text))
            .unwrap_or((self.span, ""));
        vec![self.finding(span, text, None)]
    }

    fn forbidden(&self) -> Vec<Finding> {
        let map = self.replacement_map();
        let comparison = self.spec.comparison;
        let mut hits = Vec::new();
        for token in self.tokens() {
            for m in find_matches(token.text, &self.candidates, comparison) {
                let (start, end) = match trim_range(token.text, m.start, m.end, self.spec.left_trim, self.spec.right_trim)
                {
                    (s, e) if s < e => (s, e),
                    _ => (m.start, m.end),
                };
                let span = token.span.sub(start, end - start);
                let found = &token.text[start..end];
                let replacement = map.lookup(&token.text[m.start..m.end]).or_else(|| {
                    self.spec.replacement.as_ref().map(|template| {
                        let value = expand_template(template, &TemplateContext::new(self.entity).with_found(found));
                        match comparison {
                            Comparison::Ordinal => value,
                            Comparison::IgnoreCase => match_case(found, &value),
                        }
                    })
                });
                hits.push(Hit {
                    span,
                    found: found.to_string(),
                    op: replacement.map(|text| RewriteOp::replace_text(span, found, text)),
                });
            }
        }
        self.report(hits, true)
    }

    fn equals(&self) -> Vec<Finding> {
        let view = self.view();
        let plain = collapse(view.text());
        let comparison = self.spec.comparison;
        if !self.candidates.iter().any(|c| same_text(&plain, c.trim(), comparison)) {
            return Vec::new();
        }
        let span = self.logical_span(&view, view.content_start(), view.content_end());
        let ops = self.spec.replacement.as_ref().map(|template| {
            let value = expand_template(template, &TemplateContext::new(self.entity).with_found(&plain));
            vec![RewriteOp::ReplaceNode {
                path: self.path.clone(),
                node: self.rebuilt(value),
            }]
        });
        vec![self.finding(span, &plain, ops)]
    }

    /// The scope element with its content replaced by `text`, keeping the
    /// line layout (`<summary>\n/// text\n/// </summary>`) when it had one.
    fn rebuilt(&self, text: String) -> CommentNode {
        let mut element = Element {
            children: Vec::new(),
            self_closing: false,
            span: None,
            inner: None,
            ..self.element.clone()
        };
        if self.element.children.iter().any(is_break) {
            element.children = vec![CommentNode::text("\n"), CommentNode::text(text), CommentNode::text("\n")];
        } else {
            element.children = vec![CommentNode::text(text)];
        }
        element.into()
    }

    // ------------------------------------------------------------------------
    // Structural checks
    // ------------------------------------------------------------------------

    fn sentence_length(&self, max_words: usize, delimiters: &str) -> Vec<Finding> {
        let prose = without_blocks(self.element, &self.spec.exclude);
        let view = TextView::of_element(&prose, self.path.clone());
        let text = view.text();
        let hits = sentences(text, delimiters)
            .into_iter()
            .filter_map(|(start, end)| {
                let raw = &text[start..end];
                let sentence = raw.trim();
                if sentence.split_whitespace().count() <= max_words {
                    return None;
                }
                let lead = start + (raw.len() - raw.trim_start().len());
                let tail = start + raw.trim_end().len();
                Some(Hit {
                    span: self.logical_span(&view, lead, tail),
                    found: sentence.to_string(),
                    op: None,
                })
            })
            .collect();
        self.report(hits, false)
    }

    fn blank_lines(&self) -> Vec<Finding> {
        let mut hits = Vec::new();
        let mut after_break = false;
        for (index, child) in self.element.children.iter().enumerate() {
            match child {
                CommentNode::Text(run) if run.is_newline() => {
                    if after_break {
                        hits.push(Hit {
                            span: run.span.unwrap_or(self.span),
                            found: String::new(),
                            op: Some(RewriteOp::RemoveNode {
                                path: self.path.child(index),
                            }),
                        });
                    }
                    after_break = true;
                }
                CommentNode::Text(run) if run.is_whitespace() => {}
                _ => after_break = false,
            }
        }
        self.report(hits, true)
    }

    fn manual_list(&self) -> Vec<Finding> {
        let lines: Vec<&[CommentNode]> = self.element.children.split(is_break).collect();
        let bullets: Vec<&TextRun> = lines.iter().filter_map(|l| bullet_run(l)).map(|(_, run)| run).collect();
        if bullets.is_empty() {
            return Vec::new();
        }
        let op = RewriteOp::ReplaceNode {
            path: self.path.clone(),
            node: self.listified(&lines),
        };
        let hits = bullets
            .into_iter()
            .map(|run| Hit {
                span: run.span.unwrap_or(self.span),
                found: run.text.trim().to_string(),
                op: Some(op.clone()),
            })
            .collect();
        self.report(hits, false)
    }

    /// The scope element with runs of bulleted lines turned into `<list>`s.
    fn listified(&self, lines: &[&[CommentNode]]) -> CommentNode {
        let mut units: Vec<Vec<CommentNode>> = Vec::new();
        let mut items = Vec::new();
        for line in lines {
            match bullet_item(line) {
                Some(item) => items.push(item),
                None => {
                    if !items.is_empty() {
                        units.push(vec![bullet_list(std::mem::take(&mut items))]);
                    }
                    units.push(line.to_vec());
                }
            }
        }
        if !items.is_empty() {
            units.push(vec![bullet_list(items)]);
        }

        let mut element = Element {
            children: Vec::new(),
            span: None,
            inner: None,
            ..self.element.clone()
        };
        for (i, unit) in units.into_iter().enumerate() {
            if i > 0 {
                element.children.push(CommentNode::text("\n"));
            }
            element.children.extend(unit);
        }
        element.into()
    }

    fn empty(&self) -> Vec<Finding> {
        if !self.view().text().trim().is_empty() {
            return Vec::new();
        }
        vec![self.finding(self.span, "", None)]
    }

    fn third_person_verb(&self) -> Vec<Finding> {
        let view = self.view();
        let (pos, _) = skip_prefixes(view.text(), view.content_start(), &self.spec.ignorable_prefixes);
        let words = view.words();
        let Some(mut index) = words.iter().position(|(s, _)| *s >= pos) else {
            return Vec::new();
        };
        while let Some((_, w)) = words.get(index) {
            let bare = bare_word(w);
            if bare.to_lowercase().ends_with("ly") && is_adjective_or_adverb(bare) {
                index += 1;
            } else {
                break;
            }
        }
        let Some(&(start, word)) = words.get(index) else {
            return Vec::new();
        };
        if !matches!(view.segment_at(start).map(|s| &s.source), Some(SegmentSource::Run { .. })) {
            return Vec::new();
        }
        let bare = bare_word(word);
        if !bare.chars().next().is_some_and(char::is_alphabetic)
            || is_third_person_singular_verb(bare)
            || is_function_word(bare)
            || is_identifier(bare)
            || is_acronym(bare)
        {
            return Vec::new();
        }

        let next = words.get(index + 1).map(|(_, w)| bare_word(w).to_lowercase());
        let fixable = is_gerund(bare) || is_past_tense(bare) || matches!(next.as_deref(), Some("a" | "an" | "the"));
        let ops = fixable
            .then(|| view.span_of(start, bare.len()))
            .flatten()
            .and_then(|span| {
                let verb = match_case(bare, &conjugate_third_person_singular(&base_form(bare)));
                if !is_third_person_singular_verb(&verb) {
                    debug!(rule = %self.rule.id, word = bare, %verb, "no third-person form");
                    return None;
                }
                Some(vec![RewriteOp::replace_text(span, bare, verb)])
            });
        let span = self.logical_span(&view, start, start + bare.len());
        vec![self.finding(span, bare, ops)]
    }
}

// ============================================================================
// Tests
// ============================================================================
