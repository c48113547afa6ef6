//! JSON output types for host responses.
//!
//! Every response starts with `status` and carries `schema_version`. Field
//! and array order is deterministic: findings follow input file order, then
//! span start, then rule order.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{DocError, OutputErrorCode};
use crate::evaluate::{Finding, Proposal};
use crate::rule::{Rule, Severity};
use crate::scan::SkippedRule;
use crate::text::LineIndex;

/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Shared Types
// ============================================================================

/// Location in an input file.
///
/// `line` and `col` are 1-indexed (columns count chars); byte offsets index
/// the file's `source` text, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub byte_start: usize,
    pub byte_end: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, source: &str, index: &LineIndex, byte_start: usize, byte_end: usize) -> Self {
        let (line, col) = index.position(source, byte_start);
        Location {
            file: file.into(),
            line,
            col,
            byte_start,
            byte_end,
        }
    }
}

/// One finding as reported to hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingInfo {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// Declaration the comment belongs to, e.g. `method Parser.TryParse`.
    pub entity: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<Proposal>,
}

impl FindingInfo {
    pub fn new(finding: &Finding, file: &str, source: &str, index: &LineIndex) -> Self {
        FindingInfo {
            rule_id: finding.rule_id.clone(),
            severity: finding.severity,
            message: finding.message.clone(),
            entity: finding.entity.to_string(),
            location: Location::new(file, source, index, finding.span.start, finding.span.end()),
            proposal: finding.proposal.clone(),
        }
    }
}

/// One applied replacement, located in the text it was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditInfo {
    pub rule_id: String,
    pub location: Location,
    pub original: String,
    pub replacement: String,
}

/// A file whose comments changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedFile {
    pub file: String,
    /// Unified diff of the file's source text.
    pub diff: String,
}

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &DocError) -> Self {
        let details = match err {
            DocError::InvalidArguments { details, .. } => details.clone(),
            DocError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            DocError::InvalidSnapshot { file, .. } => Some(serde_json::json!({ "file": file })),
            DocError::MalformedComment { file, offset, .. } => {
                Some(serde_json::json!({ "file": file, "offset": offset }))
            }
            DocError::ApplyError { file: Some(file), .. } => Some(serde_json::json!({ "file": file })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response of `check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub status: String,
    pub schema_version: String,
    pub files_checked: usize,
    pub entities_checked: usize,
    pub findings: Vec<FindingInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRule>,
}

impl CheckResponse {
    pub fn new(
        files_checked: usize,
        entities_checked: usize,
        findings: Vec<FindingInfo>,
        skipped: Vec<SkippedRule>,
    ) -> Self {
        CheckResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            files_checked,
            entities_checked,
            findings,
            skipped,
        }
    }
}

/// Response of `fix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResponse {
    pub status: String,
    pub schema_version: String,
    pub files_checked: usize,
    pub entities_fixed: usize,
    pub edits: Vec<EditInfo>,
    pub fixed_files: Vec<FixedFile>,
    /// Findings no fix could address.
    pub remaining: Vec<FindingInfo>,
}

impl FixResponse {
    pub fn new(
        files_checked: usize,
        entities_fixed: usize,
        edits: Vec<EditInfo>,
        fixed_files: Vec<FixedFile>,
        remaining: Vec<FindingInfo>,
    ) -> Self {
        FixResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            files_checked,
            entities_fixed,
            edits,
            fixed_files,
            remaining,
        }
    }
}

/// One rule as listed by `rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub description: String,
    pub applies_to: String,
    pub fixable: bool,
}

impl From<&Rule> for RuleInfo {
    fn from(rule: &Rule) -> Self {
        RuleInfo {
            id: rule.id.clone(),
            name: rule.name.clone(),
            severity: rule.severity,
            description: rule.description.clone(),
            applies_to: rule.applicability.to_string(),
            fixable: rule.strategy != crate::rule::RewriteStrategy::ReportOnly,
        }
    }
}

/// Response of `rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesResponse {
    pub status: String,
    pub schema_version: String,
    pub rules: Vec<RuleInfo>,
}

impl RulesResponse {
    pub fn new(rules: &[Rule]) -> Self {
        RulesResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            rules: rules.iter().map(RuleInfo::from).collect(),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &DocError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty JSON.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line).
pub fn emit_response_compact<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
