//! Applicability predicates over source entities.
//!
//! A rule applies to an entity when its predicate holds. Predicates are
//! written as small expressions over entity metadata and combined with
//! boolean operators (`and`, `or`, `not`) and parentheses.
//!
//! ## Grammar
//!
//! ```text
//! <expr>       := <term> (("and" | "or") <term>)*
//! <term>       := ["not"] <factor>
//! <factor>     := <predicate> | "(" <expr> ")"
//! <predicate>  := key ":" glob | key "~" regex | key comparator value
//! ```
//!
//! `any` (or `*`) on its own is the predicate that always holds.
//!
//! ## Keys
//!
//! - `kind` - entity kind (`type`, `method`, `property`, ...)
//! - `name` - entity name
//! - `access` - accessibility (`public`, `private`, ...)
//! - `type` - declared or return type
//! - `containing` - containing type name
//! - `modifier` - declaration modifier (`modifier=static`)
//! - `params` - parameter count (`params>0`)
//! - `used` - usage fact (`used=true`)
//! - `getter` / `setter` - property accessors
//!
//! ## Examples
//!
//! ```text
//! kind=method and type=bool
//! kind=property and getter=true and setter=false
//! kind=parameter and used=true
//! not access=private and name:Try*
//! ```

use std::fmt;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

use crate::entity::{EntityKind, Modifier, SourceEntity};

/// Error type for predicate parsing.
#[derive(Debug, Error)]
pub enum PredicateError {
    /// Invalid expression syntax.
    #[error("invalid predicate '{input}': {message}")]
    InvalidExpression { input: String, message: String },

    /// Invalid glob or regex in a predicate.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Value not valid for the key or operator.
    #[error("invalid value '{value}' for key '{key}': {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// ============================================================================
// Keys and Operators
// ============================================================================

/// Entity property a predicate tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKey {
    Kind,
    Name,
    Access,
    Type,
    Containing,
    Modifier,
    Params,
    Used,
    Getter,
    Setter,
}

impl PredicateKey {
    /// Parse a key from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "kind" => Some(PredicateKey::Kind),
            "name" => Some(PredicateKey::Name),
            "access" => Some(PredicateKey::Access),
            "type" => Some(PredicateKey::Type),
            "containing" => Some(PredicateKey::Containing),
            "modifier" => Some(PredicateKey::Modifier),
            "params" => Some(PredicateKey::Params),
            "used" => Some(PredicateKey::Used),
            "getter" => Some(PredicateKey::Getter),
            "setter" => Some(PredicateKey::Setter),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PredicateKey::Kind => "kind",
            PredicateKey::Name => "name",
            PredicateKey::Access => "access",
            PredicateKey::Type => "type",
            PredicateKey::Containing => "containing",
            PredicateKey::Modifier => "modifier",
            PredicateKey::Params => "params",
            PredicateKey::Used => "used",
            PredicateKey::Getter => "getter",
            PredicateKey::Setter => "setter",
        }
    }

    fn is_boolean(self) -> bool {
        matches!(self, PredicateKey::Used | PredicateKey::Getter | PredicateKey::Setter)
    }

    fn is_textual(self) -> bool {
        matches!(
            self,
            PredicateKey::Kind
                | PredicateKey::Name
                | PredicateKey::Access
                | PredicateKey::Type
                | PredicateKey::Containing
        )
    }
}

/// Predicate comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    /// Glob pattern match (`:` operator).
    Glob,
    /// Equality (`=` operator).
    Eq,
    /// Inequality (`!=` operator).
    Neq,
    /// Greater than (`>` operator).
    Gt,
    /// Greater than or equal (`>=` operator).
    Gte,
    /// Less than (`<` operator).
    Lt,
    /// Less than or equal (`<=` operator).
    Lte,
    /// Regex match (`~` operator).
    Match,
}

impl PredicateOp {
    fn is_ordering(self) -> bool {
        matches!(self, PredicateOp::Gt | PredicateOp::Gte | PredicateOp::Lt | PredicateOp::Lte)
    }
}

/// Compiled form of a predicate value.
#[derive(Debug, Clone)]
enum ValueMatcher {
    Text(String),
    Glob(GlobMatcher),
    Regex(Regex),
    Count(usize),
    Flag(bool),
    Modifier(Modifier),
}

/// A single `key op value` test.
#[derive(Debug, Clone)]
pub struct KeyPredicate {
    pub key: PredicateKey,
    pub op: PredicateOp,
    pub value: String,
    matcher: ValueMatcher,
}

impl KeyPredicate {
    /// Validate the value for the key/op pair and compile patterns.
    pub fn new(key: PredicateKey, op: PredicateOp, value: impl Into<String>) -> Result<Self, PredicateError> {
        let value = value.into();
        let invalid = |message: &str| PredicateError::InvalidValue {
            key: key.as_str().to_string(),
            value: value.clone(),
            message: message.to_string(),
        };

        let matcher = match (key, op) {
            (PredicateKey::Params, PredicateOp::Glob | PredicateOp::Match) => {
                return Err(invalid("params supports =, !=, <, <=, >, >="));
            }
            (PredicateKey::Params, _) => ValueMatcher::Count(
                value
                    .parse::<usize>()
                    .map_err(|_| invalid("expected a non-negative integer"))?,
            ),
            (k, PredicateOp::Eq | PredicateOp::Neq) if k.is_boolean() => match value.as_str() {
                "true" => ValueMatcher::Flag(true),
                "false" => ValueMatcher::Flag(false),
                _ => return Err(invalid("expected true or false")),
            },
            (k, _) if k.is_boolean() => return Err(invalid("boolean keys support = and != only")),
            (PredicateKey::Modifier, PredicateOp::Eq | PredicateOp::Neq) => {
                ValueMatcher::Modifier(parse_modifier(&value).ok_or_else(|| invalid("unknown modifier"))?)
            }
            (PredicateKey::Modifier, _) => return Err(invalid("modifier supports = and != only")),
            (_, o) if o.is_ordering() => return Err(invalid("ordering is only defined for params")),
            (PredicateKey::Kind, PredicateOp::Eq | PredicateOp::Neq) => {
                EntityKind::parse(&value).ok_or_else(|| invalid("unknown entity kind"))?;
                ValueMatcher::Text(value.clone())
            }
            (_, PredicateOp::Glob) => ValueMatcher::Glob(
                Glob::new(&value)
                    .map_err(|e| PredicateError::InvalidPattern {
                        pattern: value.clone(),
                        message: e.to_string(),
                    })?
                    .compile_matcher(),
            ),
            (_, PredicateOp::Match) => ValueMatcher::Regex(Regex::new(&value).map_err(|e| {
                PredicateError::InvalidPattern {
                    pattern: value.clone(),
                    message: e.to_string(),
                }
            })?),
            _ => ValueMatcher::Text(value.clone()),
        };

        Ok(KeyPredicate {
            key,
            op,
            value,
            matcher,
        })
    }

    /// Evaluate against an entity.
    pub fn matches(&self, entity: &SourceEntity) -> bool {
        if self.key.is_textual() {
            let actual = match self.key {
                PredicateKey::Kind => Some(entity.kind.as_str()),
                PredicateKey::Name => Some(entity.name.as_str()),
                PredicateKey::Access => Some(entity.accessibility.as_str()),
                PredicateKey::Type => entity.type_name.as_deref(),
                PredicateKey::Containing => entity.containing_type.as_deref(),
                _ => None,
            };
            return self.matches_text(actual);
        }

        match (&self.matcher, self.key) {
            (ValueMatcher::Count(expected), PredicateKey::Params) => {
                apply_op_numeric(self.op, entity.parameters.len(), *expected)
            }
            (ValueMatcher::Flag(expected), key) => {
                let actual = match key {
                    PredicateKey::Used => entity.is_referenced,
                    PredicateKey::Getter => entity.accessors.map(|a| a.get),
                    PredicateKey::Setter => entity.accessors.map(|a| a.set),
                    _ => None,
                };
                // An unknown fact never satisfies `=`.
                match actual {
                    Some(actual) => apply_op_bool(self.op, actual == *expected),
                    None => self.op == PredicateOp::Neq,
                }
            }
            (ValueMatcher::Modifier(modifier), _) => {
                apply_op_bool(self.op, entity.has_modifier(*modifier))
            }
            _ => false,
        }
    }

    fn matches_text(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return self.op == PredicateOp::Neq;
        };
        match &self.matcher {
            ValueMatcher::Glob(glob) => glob.is_match(actual),
            ValueMatcher::Regex(regex) => regex.is_match(actual),
            ValueMatcher::Text(expected) => apply_op_bool(self.op, actual == expected),
            _ => false,
        }
    }
}

fn parse_modifier(s: &str) -> Option<Modifier> {
    [
        Modifier::Static,
        Modifier::Async,
        Modifier::Abstract,
        Modifier::Override,
        Modifier::Virtual,
        Modifier::Sealed,
        Modifier::Readonly,
        Modifier::Const,
    ]
    .into_iter()
    .find(|m| m.as_str() == s)
}

/// Apply operator to boolean match result.
fn apply_op_bool(op: PredicateOp, matches: bool) -> bool {
    match op {
        PredicateOp::Neq => !matches,
        _ => matches,
    }
}

/// Apply operator to numeric comparison.
fn apply_op_numeric(op: PredicateOp, actual: usize, expected: usize) -> bool {
    match op {
        PredicateOp::Glob | PredicateOp::Eq | PredicateOp::Match => actual == expected,
        PredicateOp::Neq => actual != expected,
        PredicateOp::Gt => actual > expected,
        PredicateOp::Gte => actual >= expected,
        PredicateOp::Lt => actual < expected,
        PredicateOp::Lte => actual <= expected,
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// A predicate expression combining key tests with boolean operators.
#[derive(Debug, Clone)]
pub enum PredicateExpr {
    /// Always holds.
    Any,
    /// Conjunction of expressions (all must match).
    And(Vec<PredicateExpr>),
    /// Disjunction of expressions (any must match).
    Or(Vec<PredicateExpr>),
    /// Negation of an expression.
    Not(Box<PredicateExpr>),
    /// A single key test.
    Pred(KeyPredicate),
}

impl PredicateExpr {
    /// Evaluate this expression against an entity.
    pub fn matches(&self, entity: &SourceEntity) -> bool {
        match self {
            PredicateExpr::Any => true,
            PredicateExpr::And(exprs) => exprs.iter().all(|e| e.matches(entity)),
            PredicateExpr::Or(exprs) => exprs.iter().any(|e| e.matches(entity)),
            PredicateExpr::Not(expr) => !expr.matches(entity),
            PredicateExpr::Pred(pred) => pred.matches(entity),
        }
    }
}

/// A parsed predicate together with its source text.
///
/// Serializes as the source text, so rule files carry predicates as plain
/// strings.
#[derive(Debug, Clone)]
pub struct Applicability {
    source: String,
    expr: PredicateExpr,
}

impl Applicability {
    /// The predicate that applies to every entity.
    pub fn any() -> Self {
        Applicability {
            source: "any".to_string(),
            expr: PredicateExpr::Any,
        }
    }

    /// Parse a predicate expression.
    pub fn parse(source: &str) -> Result<Self, PredicateError> {
        Ok(Applicability {
            source: source.trim().to_string(),
            expr: parse_predicate_expr(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &PredicateExpr {
        &self.expr
    }

    /// True if the rule applies to `entity`.
    pub fn matches(&self, entity: &SourceEntity) -> bool {
        self.expr.matches(entity)
    }
}

impl Default for Applicability {
    fn default() -> Self {
        Applicability::any()
    }
}

impl PartialEq for Applicability {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Applicability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Applicability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Applicability::parse(&source).map_err(serde::de::Error::custom)
    }
}

/// Parse a predicate expression from a string.
pub fn parse_predicate_expr(input: &str) -> Result<PredicateExpr, PredicateError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PredicateError::InvalidExpression {
            input: input.to_string(),
            message: "empty expression".to_string(),
        });
    }
    if input == "*" || input.eq_ignore_ascii_case("any") {
        return Ok(PredicateExpr::Any);
    }

    let raw = parse_expr.parse(input).map_err(|e| PredicateError::InvalidExpression {
        input: input.to_string(),
        message: format!("{:?}", e),
    })?;
    raw.compile()
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

/// Parsed but not yet validated expression.
#[derive(Debug, Clone)]
enum RawExpr {
    And(Vec<RawExpr>),
    Or(Vec<RawExpr>),
    Not(Box<RawExpr>),
    Pred(PredicateKey, PredicateOp, String),
}

impl RawExpr {
    fn compile(self) -> Result<PredicateExpr, PredicateError> {
        Ok(match self {
            RawExpr::And(exprs) => PredicateExpr::And(
                exprs.into_iter().map(RawExpr::compile).collect::<Result<_, _>>()?,
            ),
            RawExpr::Or(exprs) => PredicateExpr::Or(
                exprs.into_iter().map(RawExpr::compile).collect::<Result<_, _>>()?,
            ),
            RawExpr::Not(expr) => PredicateExpr::Not(Box::new(expr.compile()?)),
            RawExpr::Pred(key, op, value) => PredicateExpr::Pred(KeyPredicate::new(key, op, value)?),
        })
    }
}

/// Parse the top-level expression (handles 'or' at lowest precedence).
fn parse_expr(input: &mut &str) -> ModalResult<RawExpr> {
    let first = parse_and_expr(input)?;

    let rest: Vec<RawExpr> = repeat(
        0..,
        preceded((multispace0, keyword("or"), multispace0), parse_and_expr),
    )
    .parse_next(input)?;

    let _ = multispace0.parse_next(input)?;
    if rest.is_empty() {
        Ok(first)
    } else {
        let mut all = vec![first];
        all.extend(rest);
        Ok(RawExpr::Or(all))
    }
}

/// Parse an 'and' expression (higher precedence than 'or').
fn parse_and_expr(input: &mut &str) -> ModalResult<RawExpr> {
    let first = parse_term(input)?;

    let rest: Vec<RawExpr> = repeat(
        0..,
        preceded((multispace0, keyword("and"), multispace0), parse_term),
    )
    .parse_next(input)?;

    if rest.is_empty() {
        Ok(first)
    } else {
        let mut all = vec![first];
        all.extend(rest);
        Ok(RawExpr::And(all))
    }
}

/// Parse a term (handles 'not' prefix).
fn parse_term(input: &mut &str) -> ModalResult<RawExpr> {
    let _ = multispace0.parse_next(input)?;

    let negated = opt((keyword("not"), multispace0)).parse_next(input)?.is_some();

    let factor = parse_factor(input)?;

    if negated {
        Ok(RawExpr::Not(Box::new(factor)))
    } else {
        Ok(factor)
    }
}

/// Parse a factor (predicate or parenthesized expression).
fn parse_factor(input: &mut &str) -> ModalResult<RawExpr> {
    let _ = multispace0.parse_next(input)?;

    alt((
        delimited(('(', multispace0), parse_expr, (multispace0, ')')),
        parse_predicate,
    ))
    .parse_next(input)
}

/// Parse a predicate (key:value, key~regex, key>value, etc.).
fn parse_predicate(input: &mut &str) -> ModalResult<RawExpr> {
    let _ = multispace0.parse_next(input)?;

    let key_str: &str =
        take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)?;
    let key = PredicateKey::parse(key_str).ok_or_else(|| ErrMode::from_input(input))?;

    let op = parse_operator(input)?;
    let value = parse_value(input)?;

    Ok(RawExpr::Pred(key, op, value))
}

/// Parse an operator.
fn parse_operator(input: &mut &str) -> ModalResult<PredicateOp> {
    alt((
        ">=".map(|_| PredicateOp::Gte),
        "<=".map(|_| PredicateOp::Lte),
        "!=".map(|_| PredicateOp::Neq),
        ">".map(|_| PredicateOp::Gt),
        "<".map(|_| PredicateOp::Lt),
        "=".map(|_| PredicateOp::Eq),
        ":".map(|_| PredicateOp::Glob),
        "~".map(|_| PredicateOp::Match),
    ))
    .parse_next(input)
}

/// Parse a value (quoted or unquoted).
fn parse_value(input: &mut &str) -> ModalResult<String> {
    alt((parse_double_quoted, parse_single_quoted, parse_unquoted)).parse_next(input)
}

fn parse_double_quoted(input: &mut &str) -> ModalResult<String> {
    delimited('"', take_till(0.., |c| c == '"'), '"')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

fn parse_single_quoted(input: &mut &str) -> ModalResult<String> {
    delimited('\'', take_till(0.., |c| c == '\''), '\'')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

/// Parse an unquoted value (stops at whitespace or parentheses).
fn parse_unquoted(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| !c.is_whitespace() && c != ')' && c != '(')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

/// Parse a case-insensitive keyword that must end at a word boundary.
fn keyword<'i>(expected: &'static str) -> impl FnMut(&mut &'i str) -> ModalResult<()> {
    move |input: &mut &'i str| {
        let checkpoint = *input;
        let word: &str = take_while(1.., |c: char| c.is_alphabetic()).parse_next(input)?;

        let at_boundary =
            input.is_empty() || input.starts_with(char::is_whitespace) || input.starts_with('(');
        if word.eq_ignore_ascii_case(expected) && at_boundary {
            Ok(())
        } else {
            *input = checkpoint;
            Err(ErrMode::from_input(input))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Accessibility;

    fn bool_method() -> SourceEntity {
        SourceEntity::new(EntityKind::Method, "TryParse")
            .with_type("bool")
            .with_parameter("text", "string")
            .with_modifier(Modifier::Static)
    }

    fn property(get: bool, set: bool) -> SourceEntity {
        SourceEntity::new(EntityKind::Property, "Value")
            .with_type("int")
            .with_accessors(get, set)
    }

    // =========================================================================
    // Parse Tests
    // =========================================================================

    #[test]
    fn test_parse_simple_predicate() {
        let expr = parse_predicate_expr("kind=method").unwrap();
        match expr {
            PredicateExpr::Pred(pred) => {
                assert_eq!(pred.key, PredicateKey::Kind);
                assert_eq!(pred.op, PredicateOp::Eq);
                assert_eq!(pred.value, "method");
            }
            _ => panic!("Expected Pred variant"),
        }
    }

    #[test]
    fn test_parse_any() {
        assert!(matches!(parse_predicate_expr("any").unwrap(), PredicateExpr::Any));
        assert!(matches!(parse_predicate_expr(" * ").unwrap(), PredicateExpr::Any));
    }

    #[test]
    fn test_parse_precedence_and_binds_tighter() {
        let expr = parse_predicate_expr("kind=type or kind=method and type=bool").unwrap();
        match expr {
            PredicateExpr::Or(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], PredicateExpr::And(_)));
            }
            _ => panic!("Expected Or variant"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_predicate_expr("").is_err());
        assert!(parse_predicate_expr("colour=red").is_err());
        assert!(parse_predicate_expr("kind=method and").is_err());
        assert!(matches!(
            parse_predicate_expr("params=many"),
            Err(PredicateError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_predicate_expr("kind=widget"),
            Err(PredicateError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_predicate_expr("name~\"(\""),
            Err(PredicateError::InvalidPattern { .. })
        ));
        assert!(parse_predicate_expr("name>abc").is_err());
    }

    #[test]
    fn test_not_requires_boundary() {
        // "nothing" is not the 'not' keyword
        assert!(parse_predicate_expr("nothing=1").is_err());
        let expr = parse_predicate_expr("not(kind=type)").unwrap();
        assert!(matches!(expr, PredicateExpr::Not(_)));
    }

    // =========================================================================
    // Evaluation Tests
    // =========================================================================

    #[test]
    fn test_eval_bool_method() {
        let applies = Applicability::parse("kind=method and type=bool").unwrap();
        assert!(applies.matches(&bool_method()));
        assert!(!applies.matches(&property(true, false)));
    }

    #[test]
    fn test_eval_accessors() {
        let get_set = Applicability::parse("kind=property and getter=true and setter=true").unwrap();
        assert!(get_set.matches(&property(true, true)));
        assert!(!get_set.matches(&property(true, false)));
        let no_setter = Applicability::parse("setter!=true").unwrap();
        assert!(no_setter.matches(&property(true, false)));
        assert!(no_setter.matches(&bool_method()));
    }

    #[test]
    fn test_eval_glob_regex_and_counts() {
        let entity = bool_method();
        assert!(Applicability::parse("name:Try*").unwrap().matches(&entity));
        assert!(Applicability::parse("name~'^Try[A-Z]'").unwrap().matches(&entity));
        assert!(Applicability::parse("params>=1").unwrap().matches(&entity));
        assert!(!Applicability::parse("params=0").unwrap().matches(&entity));
        assert!(Applicability::parse("modifier=static").unwrap().matches(&entity));
        assert!(Applicability::parse("modifier!=async").unwrap().matches(&entity));
    }

    #[test]
    fn test_eval_usage_fact() {
        let used = SourceEntity::new(EntityKind::Parameter, "count").with_referenced(true);
        let unknown = SourceEntity::new(EntityKind::Parameter, "count");
        let applies = Applicability::parse("kind=parameter and used=true").unwrap();
        assert!(applies.matches(&used));
        assert!(!applies.matches(&unknown));
    }

    #[test]
    fn test_eval_access_and_missing_type() {
        let private = bool_method().with_accessibility(Accessibility::Private);
        assert!(!Applicability::parse("access!=private").unwrap().matches(&private));
        let untyped = SourceEntity::new(EntityKind::Event, "Changed");
        assert!(!Applicability::parse("type=bool").unwrap().matches(&untyped));
        assert!(Applicability::parse("type!=bool").unwrap().matches(&untyped));
    }

    #[test]
    fn test_serde_round_trip_as_string() {
        let applies = Applicability::parse("kind=method").unwrap();
        let json = serde_json::to_string(&applies).unwrap();
        assert_eq!(json, "\"kind=method\"");
        let back: Applicability = serde_json::from_str(&json).unwrap();
        assert_eq!(back, applies);
        assert!(serde_json::from_str::<Applicability>("\"kind=\"").is_err());
    }
}
