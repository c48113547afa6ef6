//! Snapshot input format and the per-file check and fix drivers.
//!
//! A snapshot is what a compiler host hands over: each file's source text and
//! the declarations found in it, each pointing at its documentation comment
//! by byte range.
//!
//! ```json
//! { "files": [ { "path": "src/Probe.cs", "source": "...",
//!     "entities": [ { "kind": "method", "name": "Exists", "type": "bool",
//!                     "comment": { "start": 10, "end": 62 } } ] } ] }
//! ```
//!
//! Entities pointing at the same range (a method and its parameters) share
//! one comment tree; their fixes chain on it. Distinct ranges must not
//! overlap.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use docphrase_core::entity::SourceEntity;
use docphrase_core::error::DocError;
use docphrase_core::evaluate::Finding;
use docphrase_core::markup::{parse_doc_comment, MarkupError};
use docphrase_core::output::{EditInfo, FindingInfo, FixedFile, Location};
use docphrase_core::rewrite::{splice, DiffEntry};
use docphrase_core::scan::{CancellationToken, FixOutcome, ScanItem, Scanner};
use docphrase_core::span::{BufferId, Generation, TextSpan};
use docphrase_core::text::LineIndex;
use docphrase_core::tree::CommentTree;

use crate::diff::generate_unified_diff;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file}: comment of {entity} at {start}..{end} is outside the source")]
    CommentOutOfRange {
        file: String,
        entity: String,
        start: usize,
        end: usize,
    },

    #[error("{file}: comments at {first} and {second} overlap")]
    OverlappingComments { file: String, first: usize, second: usize },

    #[error("{file}: comment of {entity}: {source}")]
    Markup {
        file: String,
        entity: String,
        #[source]
        source: MarkupError,
    },
}

impl From<SnapshotError> for DocError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                DocError::file_not_found(path.display().to_string())
            }
            SnapshotError::Markup { file, source, .. } => DocError::from_markup(file, &source),
            SnapshotError::Io { ref path, .. } | SnapshotError::Json { ref path, .. } => DocError::InvalidSnapshot {
                file: path.display().to_string(),
                message: err.to_string(),
            },
            SnapshotError::CommentOutOfRange { ref file, .. } | SnapshotError::OverlappingComments { ref file, .. } => {
                DocError::InvalidSnapshot {
                    file: file.clone(),
                    message: err.to_string(),
                }
            }
        }
    }
}

// ============================================================================
// Format
// ============================================================================

/// Byte range of a comment in its file's source, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommentRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(flatten)]
    pub entity: SourceEntity,
    pub comment: CommentRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub path: String,
    pub source: String,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub files: Vec<SnapshotFile>,
}

impl Snapshot {
    pub fn parse(json: &str, path: &Path) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Snapshot::parse(&json, path)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================================
// Comment Groups
// ============================================================================

/// Entities sharing one comment, parsed once.
#[derive(Debug, Clone)]
pub struct CommentGroup {
    pub range: CommentRange,
    /// Indices into the file's `entities`.
    pub members: Vec<usize>,
    pub tree: CommentTree,
}

impl SnapshotFile {
    /// Parse every distinct comment of the file into `buffer`.
    ///
    /// Groups come back in source order.
    pub fn comment_groups(&self, buffer: BufferId) -> Result<Vec<CommentGroup>, SnapshotError> {
        let mut by_range: BTreeMap<CommentRange, Vec<usize>> = BTreeMap::new();
        for (index, record) in self.entities.iter().enumerate() {
            let CommentRange { start, end } = record.comment;
            if start > end || self.source.get(start..end).is_none() {
                return Err(SnapshotError::CommentOutOfRange {
                    file: self.path.clone(),
                    entity: record.entity.display_name(),
                    start,
                    end,
                });
            }
            by_range.entry(record.comment).or_default().push(index);
        }

        let mut groups: Vec<CommentGroup> = Vec::with_capacity(by_range.len());
        for (range, members) in by_range {
            if let Some(previous) = groups.last() {
                if range.start < previous.range.end {
                    return Err(SnapshotError::OverlappingComments {
                        file: self.path.clone(),
                        first: previous.range.start,
                        second: range.start,
                    });
                }
            }
            let tree = parse_doc_comment(&self.source[range.start..range.end], range.start, buffer).map_err(
                |source| SnapshotError::Markup {
                    file: self.path.clone(),
                    entity: self.entities[members[0]].entity.display_name(),
                    source,
                },
            )?;
            groups.push(CommentGroup { range, members, tree });
        }
        Ok(groups)
    }
}

// ============================================================================
// Check
// ============================================================================

/// One snapshot file with its parsed comments.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub file: SnapshotFile,
    pub buffer: BufferId,
    pub groups: Vec<CommentGroup>,
    pub index: LineIndex,
}

impl LoadedFile {
    pub fn new(file: SnapshotFile, buffer: BufferId) -> Result<Self, SnapshotError> {
        let groups = file.comment_groups(buffer)?;
        let index = LineIndex::new(&file.source);
        Ok(LoadedFile {
            file,
            buffer,
            groups,
            index,
        })
    }

    /// One scan item per entity, in group order.
    pub fn scan_items(&self) -> Vec<ScanItem> {
        self.groups
            .iter()
            .flat_map(|group| {
                group.members.iter().map(|&member| ScanItem {
                    entity: self.file.entities[member].entity.clone(),
                    tree: group.tree.clone(),
                })
            })
            .collect()
    }

    pub fn finding_info(&self, finding: &Finding) -> FindingInfo {
        FindingInfo::new(finding, &self.file.path, &self.file.source, &self.index)
    }
}

/// Load every file of `snapshots`, numbering buffers across all of them.
pub fn load_files(snapshots: Vec<Snapshot>) -> Result<Vec<LoadedFile>, SnapshotError> {
    snapshots
        .into_iter()
        .flat_map(|snapshot| snapshot.files)
        .enumerate()
        .map(|(i, file)| LoadedFile::new(file, BufferId(i as u32)))
        .collect()
}

/// Findings mapped back to their files through the buffer id.
pub fn finding_infos(files: &[LoadedFile], findings: &[Finding]) -> Vec<FindingInfo> {
    findings
        .iter()
        .filter_map(|finding| {
            let file = files.get(finding.span.buffer.0 as usize)?;
            Some(file.finding_info(finding))
        })
        .collect()
}

// ============================================================================
// Fix
// ============================================================================

/// Result of fixing one file.
#[derive(Debug, Clone)]
pub struct FileFix {
    pub file: SnapshotFile,
    pub edits: Vec<EditInfo>,
    pub remaining: Vec<FindingInfo>,
    /// `None` when nothing changed.
    pub fixed: Option<FixedFile>,
    pub entities_fixed: usize,
}

/// Fix every comment of `loaded` until stable and rebuild its source.
///
/// Groups are fixed independently and spliced back last-to-first so earlier
/// ranges stay valid; entity comment ranges are shifted to the new text.
pub fn fix_file(scanner: &Scanner, loaded: &LoadedFile, cancel: &CancellationToken) -> FileFix {
    let original = &loaded.file.source;
    let mut edits = Vec::new();
    let mut remaining_by_group = Vec::new();
    let mut replacements: Vec<DiffEntry> = Vec::new();
    let mut deltas: Vec<(CommentRange, i64)> = Vec::new();
    let mut entities_fixed = 0;

    for group in &loaded.groups {
        if cancel.is_cancelled() {
            break;
        }
        let mut tree = group.tree.clone();
        let mut text = original.clone();
        for &member in &group.members {
            let entity = &loaded.file.entities[member].entity;
            let outcome: FixOutcome = scanner.fix(entity, tree);
            if !outcome.passes.is_empty() {
                entities_fixed += 1;
            }
            for pass in &outcome.passes {
                let index = LineIndex::new(&text);
                edits.extend(pass.diff.iter().map(|entry| EditInfo {
                    rule_id: pass.rule_id.clone(),
                    location: Location::new(
                        &loaded.file.path,
                        &text,
                        &index,
                        entry.original.start,
                        entry.original.end(),
                    ),
                    original: entry.original.slice(&text).unwrap_or_default().to_string(),
                    replacement: entry.replacement.clone(),
                }));
                text = splice(&text, &pass.diff);
            }
            tree = outcome.tree;
        }
        // Later members' fixes move earlier members' leftovers, so every
        // member is checked again against the final comment.
        let remaining: Vec<Finding> = group
            .members
            .iter()
            .flat_map(|&member| scanner.check(&loaded.file.entities[member].entity, &tree).0)
            .collect();

        let new_end = (group.range.end as i64 + text.len() as i64 - original.len() as i64) as usize;
        let comment = text[group.range.start..new_end].to_string();
        let delta = comment.len() as i64 - (group.range.end - group.range.start) as i64;
        if delta != 0 || comment != original[group.range.start..group.range.end] {
            replacements.push(DiffEntry {
                original: TextSpan::from_range(loaded.buffer, Generation::default(), group.range.start, group.range.end),
                replacement: comment,
            });
        }
        deltas.push((group.range, delta));
        remaining_by_group.push((group.range.start, remaining));
    }

    let source = splice(original, &replacements);
    let index = LineIndex::new(&source);
    let remaining = remaining_by_group
        .into_iter()
        .flat_map(|(start, findings)| {
            let shift = shift_before(&deltas, start);
            findings.into_iter().map(move |mut finding| {
                finding.span.start = (finding.span.start as i64 + shift) as usize;
                finding
            })
        })
        .map(|finding| FindingInfo::new(&finding, &loaded.file.path, &source, &index))
        .collect();

    let mut file = loaded.file.clone();
    for record in &mut file.entities {
        let own = deltas
            .iter()
            .find(|(range, _)| *range == record.comment)
            .map(|(_, delta)| *delta)
            .unwrap_or(0);
        let shift = shift_before(&deltas, record.comment.start);
        record.comment = CommentRange {
            start: (record.comment.start as i64 + shift) as usize,
            end: (record.comment.end as i64 + shift + own) as usize,
        };
    }

    let fixed = (!replacements.is_empty()).then(|| FixedFile {
        file: loaded.file.path.clone(),
        diff: generate_unified_diff(&loaded.file.path, original, &replacements),
    });
    debug!(file = %loaded.file.path, edits = edits.len(), "fixed file");
    file.source = source;
    FileFix {
        file,
        edits,
        remaining,
        fixed,
        entities_fixed,
    }
}

/// Total length change of the groups that end at or before `start`.
fn shift_before(deltas: &[(CommentRange, i64)], start: usize) -> i64 {
    deltas
        .iter()
        .filter(|(range, _)| range.end <= start && range.start < start)
        .map(|(_, delta)| delta)
        .sum()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use docphrase_core::config::ResolvedConfig;
    use docphrase_core::entity::EntityKind;

    use crate::catalog::builtin_rules;

    const SOURCE: &str = "class Probe {\n    /// <summary>Checks whether the file exists.</summary>\n    bool Exists();\n    /// <summary>Gets the value</summary>\n    int Value { get; }\n}\n";

    fn record(source: &str, entity: SourceEntity, comment: &str) -> EntityRecord {
        let start = source.find(comment).unwrap();
        EntityRecord {
            entity,
            comment: CommentRange {
                start,
                end: start + comment.len(),
            },
        }
    }

    fn file_with(source: &str, method_summary: &str, property_summary: &str) -> SnapshotFile {
        SnapshotFile {
            path: "Probe.cs".to_string(),
            source: source.to_string(),
            entities: vec![
                record(
                    source,
                    SourceEntity::new(EntityKind::Method, "Exists")
                        .with_type("bool")
                        .with_containing_type("Probe"),
                    &format!("/// <summary>{}</summary>", method_summary),
                ),
                record(
                    source,
                    SourceEntity::new(EntityKind::Property, "Value")
                        .with_type("int")
                        .with_accessors(true, false),
                    &format!("/// <summary>{}</summary>", property_summary),
                ),
            ],
        }
    }

    fn snapshot_file() -> SnapshotFile {
        file_with(SOURCE, "Checks whether the file exists.", "Gets the value")
    }

    fn scanner() -> Scanner {
        Scanner::new(builtin_rules().unwrap(), &ResolvedConfig::default())
    }

    mod format_tests {
        use super::*;

        #[test]
        fn entity_fields_are_flattened() {
            let json = r#"{"files": [{"path": "a.cs", "source": "/// <summary>x</summary>",
                "entities": [{"kind": "method", "name": "Run", "type": "void",
                              "comment": {"start": 0, "end": 24}}]}]}"#;
            let snapshot = Snapshot::parse(json, Path::new("s.json")).unwrap();
            let record = &snapshot.files[0].entities[0];
            assert_eq!(record.entity.name, "Run");
            assert_eq!(record.entity.type_name.as_deref(), Some("void"));
            assert_eq!(record.comment, CommentRange { start: 0, end: 24 });
        }

        #[test]
        fn invalid_json_is_an_input_error() {
            let err = Snapshot::parse("{", Path::new("s.json")).unwrap_err();
            assert_eq!(DocError::from(err).error_code().code(), 3);
        }

        #[test]
        fn comment_out_of_range_is_rejected() {
            let mut file = snapshot_file();
            file.entities[0].comment.end = SOURCE.len() + 5;
            assert!(matches!(
                file.comment_groups(BufferId(0)),
                Err(SnapshotError::CommentOutOfRange { .. })
            ));
        }

        #[test]
        fn overlapping_comments_are_rejected() {
            let mut file = snapshot_file();
            file.entities[1].comment.start = file.entities[0].comment.start + 4;
            file.entities[1].comment.end = file.entities[0].comment.end + 4;
            assert!(matches!(
                file.comment_groups(BufferId(0)),
                Err(SnapshotError::OverlappingComments { .. })
            ));
        }

        #[test]
        fn shared_comment_is_one_group() {
            let mut file = snapshot_file();
            let mut param = file.entities[0].clone();
            param.entity = SourceEntity::new(EntityKind::Parameter, "path");
            file.entities.push(param);
            let groups = file.comment_groups(BufferId(0)).unwrap();
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[0].members, vec![0, 2]);
        }
    }

    mod check_tests {
        use super::*;

        #[test]
        fn findings_map_back_to_their_file() {
            let files = load_files(vec![Snapshot {
                files: vec![snapshot_file()],
            }])
            .unwrap();
            let items = files[0].scan_items();
            let report = scanner().scan(&items, &CancellationToken::new());
            let infos = finding_infos(&files, &report.findings);

            assert!(infos.iter().all(|i| i.location.file == "Probe.cs"));
            let bool_summary = infos.iter().find(|i| i.rule_id == "DP0001").unwrap();
            assert_eq!(bool_summary.location.line, 2);
            assert_eq!(bool_summary.entity, "method Probe.Exists");
            assert!(infos.iter().any(|i| i.rule_id == "DP0007" && i.location.line == 4));
        }
    }

    mod fix_tests {
        use super::*;

        #[test]
        fn fixes_rebuild_source_and_ranges() {
            let loaded = LoadedFile::new(snapshot_file(), BufferId(0)).unwrap();
            let fix = fix_file(&scanner(), &loaded, &CancellationToken::new());

            assert!(fix
                .file
                .source
                .contains("/// <summary>Determines whether the file exists.</summary>"));
            assert!(fix.file.source.contains("/// <summary>Gets the value.</summary>"));
            assert_eq!(fix.entities_fixed, 2);
            for record in &fix.file.entities {
                let comment = &fix.file.source[record.comment.start..record.comment.end];
                assert!(comment.starts_with("/// <summary>"));
                assert!(comment.ends_with("</summary>"));
            }
            let fixed = fix.fixed.unwrap();
            assert!(fixed.diff.contains("+    /// <summary>Gets the value.</summary>"));
            assert!(fix.edits.iter().any(|e| e.rule_id == "DP0001" && e.location.line == 2));
            assert!(fix.edits.iter().any(|e| e.rule_id == "DP0007" && e.replacement.contains('.')));
        }

        #[test]
        fn unfixable_findings_survive_shared_comments() {
            let source = "class Probe {\n    /// <summary>Probe exists for files.</summary>\n    void Run(string path);\n}\n";
            let comment = "/// <summary>Probe exists for files.</summary>";
            let file = SnapshotFile {
                path: "Probe.cs".to_string(),
                source: source.to_string(),
                entities: vec![
                    record(
                        source,
                        SourceEntity::new(EntityKind::Method, "Run").with_type("void"),
                        comment,
                    ),
                    record(source, SourceEntity::new(EntityKind::Parameter, "path"), comment),
                ],
            };
            let loaded = LoadedFile::new(file, BufferId(0)).unwrap();
            let items = loaded.scan_items();
            let checked = scanner().scan(&items, &CancellationToken::new());
            assert!(checked.findings.iter().any(|f| f.rule_id == "DP0008"));

            let fix = fix_file(&scanner(), &loaded, &CancellationToken::new());
            let remaining: Vec<&str> = fix.remaining.iter().map(|f| f.rule_id.as_str()).collect();
            let reported: Vec<&str> = checked.findings.iter().map(|f| f.rule_id.as_str()).collect();
            assert_eq!(remaining, reported);
            assert_eq!(fix.remaining[0].entity, "method Run");
        }

        #[test]
        fn clean_file_is_unchanged() {
            let source = SOURCE
                .replace("Checks whether", "Determines whether")
                .replace("Gets the value<", "Gets the value.<");
            let file = file_with(&source, "Determines whether the file exists.", "Gets the value.");
            let loaded = LoadedFile::new(file, BufferId(0)).unwrap();
            let fix = fix_file(&scanner(), &loaded, &CancellationToken::new());

            assert!(fix.fixed.is_none());
            assert!(fix.edits.is_empty());
            assert_eq!(fix.file.source, loaded.file.source);
        }
    }
}
