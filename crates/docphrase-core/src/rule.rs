//! Declarative rules: one record type, a closed set of phrase positions.
//!
//! A [`Rule`] gates on entity metadata ([`Applicability`]), optionally
//! requires some tags to be present, and carries one or more [`PhraseSpec`]s.
//! Each spec names a scope element, a [`Position`] and the candidate phrases.
//! Candidates, replacements and messages are templates expanded per entity
//! (see [`expand_template`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::SourceEntity;
use crate::lexicon::{pluralize, with_article, CaseStyle};
use crate::matcher::{contains_any, ends_with_any, match_at, starts_with_any, Comparison};
use crate::predicate::{Applicability, PredicateError};
use crate::tree::TagKind;

/// Errors from rule loading and validation.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule id must not be empty")]
    EmptyId,

    #[error("rule {rule}: spec {spec} has no candidate phrases")]
    NoCandidates { rule: String, spec: usize },

    #[error("rule {rule}: replacement '{value}' does not start with a candidate phrase")]
    StartsWithReplacement { rule: String, value: String },

    #[error("rule {rule}: replacement '{value}' does not end with a candidate phrase")]
    EndsWithReplacement { rule: String, value: String },

    #[error("rule {rule}: replacement '{value}' reintroduces a forbidden phrase")]
    ReintroducesCandidate { rule: String, value: String },

    #[error("rule {rule}: {message}")]
    InvalidStructural { rule: String, message: String },

    #[error("duplicate rule id '{0}'")]
    DuplicateId(String),

    #[error(transparent)]
    Predicate(#[from] PredicateError),

    #[error("invalid rule file: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Rule Vocabulary
// ============================================================================

/// Finding severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Suggestion,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

/// How many findings a forbidding spec reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Only the first occurrence.
    #[default]
    First,
    /// Every occurrence.
    All,
}

/// Checks on the shape of the text rather than on phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralCheck {
    /// Sentences (split at any of `delimiters`) longer than `max_words`.
    SentenceLength { max_words: usize, delimiters: String },
    /// Empty comment lines inside the element.
    BlankLine,
    /// Lines bulleted by hand with `- ` or `* `.
    ManualList,
    /// Element without any text.
    Empty,
    /// First word is not a third-person singular verb.
    ThirdPersonVerb,
}

/// Where candidates must (or must not) appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    StartsWith,
    EndsWith,
    Contains,
    /// No candidate may appear anywhere.
    None,
    /// The whole trimmed text equals a candidate.
    Equals,
    Structural(StructuralCheck),
}

impl Position {
    pub fn is_structural(&self) -> bool {
        matches!(self, Position::Structural(_))
    }
}

/// Fix policy for a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStrategy {
    /// Derive the fix from the position kind.
    #[default]
    Auto,
    /// Report without a proposal.
    ReportOnly,
    /// Propose removing the scope element.
    RemoveElement,
}

fn default_scope() -> TagKind {
    TagKind::Summary
}

fn default_exclude() -> Vec<TagKind> {
    vec![TagKind::Code, TagKind::C]
}

/// One phrase check inside a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseSpec {
    /// Candidate phrase templates, in priority order.
    #[serde(default)]
    pub phrases: Vec<String>,
    pub position: Position,
    #[serde(default)]
    pub comparison: Comparison,
    /// Replacement template for forbidden phrases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Ordered `(phrase, replacement)` pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<(String, String)>,
    /// Leading words skipped before a `StartsWith` test (`Asynchronously`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignorable_prefixes: Vec<String>,
    #[serde(default = "default_scope")]
    pub scope: TagKind,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<TagKind>,
    #[serde(default)]
    pub left_trim: usize,
    #[serde(default)]
    pub right_trim: usize,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl PhraseSpec {
    /// Spec over `<summary>` with the given candidates.
    pub fn new<S: Into<String>>(position: Position, phrases: impl IntoIterator<Item = S>) -> Self {
        PhraseSpec {
            phrases: phrases.into_iter().map(Into::into).collect(),
            position,
            comparison: Comparison::Ordinal,
            replacement: None,
            replacements: Vec::new(),
            ignorable_prefixes: Vec::new(),
            scope: default_scope(),
            exclude: default_exclude(),
            left_trim: 0,
            right_trim: 0,
            cardinality: Cardinality::First,
        }
    }

    /// Structural spec over `<summary>`.
    pub fn structural(check: StructuralCheck) -> Self {
        PhraseSpec::new(Position::Structural(check), Vec::<String>::new())
    }

    pub fn scoped(mut self, scope: TagKind) -> Self {
        self.scope = scope;
        self
    }

    pub fn ignoring_case(mut self) -> Self {
        self.comparison = Comparison::IgnoreCase;
        self
    }

    pub fn with_replacement(mut self, template: impl Into<String>) -> Self {
        self.replacement = Some(template.into());
        self
    }

    pub fn with_replacements<K: Into<String>, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.replacements = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn with_ignorable_prefixes<S: Into<String>>(mut self, prefixes: impl IntoIterator<Item = S>) -> Self {
        self.ignorable_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trims(mut self, left: usize, right: usize) -> Self {
        self.left_trim = left;
        self.right_trim = right;
        self
    }

    pub fn all_occurrences(mut self) -> Self {
        self.cardinality = Cardinality::All;
        self
    }

    /// Candidate templates: the declared phrases, or the replacement map
    /// keys (longest first) when no phrases are declared.
    pub fn candidate_templates(&self) -> Vec<String> {
        if !self.phrases.is_empty() {
            return self.phrases.clone();
        }
        let mut keys: Vec<String> = self.replacements.iter().map(|(k, _)| k.clone()).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        keys
    }
}

/// A phrasing convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub applicability: Applicability,
    /// Tags that must be present for the rule to apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<TagKind>,
    pub specs: Vec<PhraseSpec>,
    /// Message template.
    pub message: String,
    #[serde(default)]
    pub strategy: RewriteStrategy,
}

impl Rule {
    /// Rule applying to every entity, without specs yet.
    pub fn new(id: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        Rule {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            severity: Severity::Warning,
            applicability: Applicability::any(),
            requires: Vec::new(),
            specs: Vec::new(),
            message: message.into(),
            strategy: RewriteStrategy::Auto,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Gate on a predicate expression.
    pub fn applies_to(mut self, expr: &str) -> Result<Self, RuleError> {
        self.applicability = Applicability::parse(expr)?;
        Ok(self)
    }

    pub fn requiring(mut self, tags: &[TagKind]) -> Self {
        self.requires = tags.to_vec();
        self
    }

    pub fn with_spec(mut self, spec: PhraseSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn with_strategy(mut self, strategy: RewriteStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Reject rules whose proposals could not silence themselves.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.id.trim().is_empty() {
            return Err(RuleError::EmptyId);
        }
        for (index, spec) in self.specs.iter().enumerate() {
            self.validate_spec(index, spec)?;
        }
        Ok(())
    }

    fn validate_spec(&self, index: usize, spec: &PhraseSpec) -> Result<(), RuleError> {
        let candidates = spec.candidate_templates();
        if let Position::Structural(check) = &spec.position {
            if let StructuralCheck::SentenceLength { max_words, delimiters } = check {
                if *max_words == 0 || delimiters.is_empty() {
                    return Err(RuleError::InvalidStructural {
                        rule: self.id.clone(),
                        message: "sentence length needs max_words > 0 and delimiters".to_string(),
                    });
                }
            }
            return Ok(());
        }
        if candidates.iter().all(|c| c.is_empty()) {
            return Err(RuleError::NoCandidates {
                rule: self.id.clone(),
                spec: index,
            });
        }

        let values = spec
            .replacements
            .iter()
            .map(|(_, v)| v.as_str())
            .chain(spec.replacement.as_deref());
        for value in values {
            let bad = match spec.position {
                Position::StartsWith => starts_with_any(value, &spec.phrases, spec.comparison)
                    .is_none()
                    .then(|| RuleError::StartsWithReplacement {
                        rule: self.id.clone(),
                        value: value.to_string(),
                    }),
                Position::EndsWith => ends_with_any(value, &spec.phrases, spec.comparison)
                    .is_none()
                    .then(|| RuleError::EndsWithReplacement {
                        rule: self.id.clone(),
                        value: value.to_string(),
                    }),
                Position::None => contains_any(value, &candidates, spec.comparison)
                    .is_some()
                    .then(|| RuleError::ReintroducesCandidate {
                        rule: self.id.clone(),
                        value: value.to_string(),
                    }),
                Position::Equals => candidates
                    .iter()
                    .any(|c| match_at(value, 0, c, spec.comparison) == Some(value.len()))
                    .then(|| RuleError::ReintroducesCandidate {
                        rule: self.id.clone(),
                        value: value.to_string(),
                    }),
                Position::Contains | Position::Structural(_) => None,
            };
            if let Some(err) = bad {
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Parse and validate a JSON array of rules.
pub fn load_rules(json: &str) -> Result<Vec<Rule>, RuleError> {
    let rules: Vec<Rule> = serde_json::from_str(json)?;
    let mut seen = std::collections::HashSet::new();
    for rule in &rules {
        rule.validate()?;
        if !seen.insert(rule.id.as_str()) {
            return Err(RuleError::DuplicateId(rule.id.clone()));
        }
    }
    Ok(rules)
}

// ============================================================================
// Templates
// ============================================================================

/// Values available to template placeholders.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub entity: &'a SourceEntity,
    /// The expected phrase.
    pub phrase: Option<&'a str>,
    /// The offending text.
    pub found: Option<&'a str>,
}

impl<'a> TemplateContext<'a> {
    pub fn new(entity: &'a SourceEntity) -> Self {
        TemplateContext {
            entity,
            phrase: None,
            found: None,
        }
    }

    pub fn with_phrase(mut self, phrase: &'a str) -> Self {
        self.phrase = Some(phrase);
        self
    }

    pub fn with_found(mut self, found: &'a str) -> Self {
        self.found = Some(found);
        self
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let type_name = self.entity.type_name.as_deref().unwrap_or("");
        match key {
            "name" => Some(self.entity.name.clone()),
            "type" => Some(type_name.to_string()),
            "containing_type" => Some(self.entity.containing_type.clone().unwrap_or_default()),
            "phrase" => Some(self.phrase.unwrap_or("").trim().to_string()),
            "found" => Some(self.found.unwrap_or("").trim().to_string()),
            "a_type" => Some(with_article(type_name, CaseStyle::Lower)),
            "types" => Some(pluralize(type_name)),
            _ => None,
        }
    }
}

/// Expand `{name}`, `{type}`, `{containing_type}`, `{phrase}`, `{found}`,
/// `{a_type}` and `{types}`. Unknown placeholders stay as written.
pub fn expand_template(template: &str, ctx: &TemplateContext<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match ctx.lookup(key) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

// ============================================================================
// Tests
// ============================================================================
