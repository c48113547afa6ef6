//! Properties that hold for every rule over a small corpus of comments.
//!
//! Each test runs a fixed rule set against every comment in the corpus and
//! checks an invariant of the engine rather than one specific output.

use docphrase_core::config::{CliOverrides, EnvOverrides, ResolvedConfig};
use docphrase_core::entity::{EntityKind, SourceEntity};
use docphrase_core::markup::parse_doc_comment;
use docphrase_core::rewrite::splice;
use docphrase_core::rule::{PhraseSpec, StructuralCheck};
use docphrase_core::span::BufferId;
use docphrase_core::tree::{CommentNode, CommentTree, TagKind};
use docphrase_core::{apply, apply_batch, evaluate, CancellationToken, Position, RewriteError, Rule, ScanItem, Scanner};

// ============================================================================
// Fixtures
// ============================================================================

const CORPUS: &[&str] = &[
    "/// <summary>\n/// Checks whether the file exists.\n/// </summary>",
    "/// <summary>Gets the value</summary>",
    "/// <summary>Creating a file, e.g. on disk.</summary>",
    "/// <summary>Asynchronously reads <see cref=\"Stream\"/> data</summary>",
    "/// <summary>Returns the <c>e.g.</c> value i.e. the total.</summary>",
    "/// <summary>\n/// First line.\n///\n///\n/// Second line.\n/// </summary>",
    "/// <summary>Lists modes.</summary>\n/// <remarks>\n/// Modes:\n/// - fast\n/// - safe\n/// </remarks>",
    "/// <summary>Storing the value.</summary>",
    "/// <summary>\n/// Queuing the message\n/// </summary>",
    "/// <summary>Writing the log.</summary>",
];

fn rules() -> Vec<Rule> {
    vec![
        Rule::new("P1", "bool-prefix", "Start with '{phrase}'")
            .applies_to("kind=method and type=bool")
            .unwrap()
            .with_spec(
                PhraseSpec::new(Position::StartsWith, ["Determines whether "])
                    .with_ignorable_prefixes(["Asynchronously "]),
            ),
        Rule::new("P2", "period", "End with a period").with_spec(PhraseSpec::new(Position::EndsWith, ["."])),
        Rule::new("P3", "latin", "Avoid '{found}'").with_spec(
            PhraseSpec::new(Position::None, ["e.g.", "i.e."])
                .with_replacements([("e.g.", "for example"), ("i.e.", "that is")])
                .all_occurrences(),
        ),
        Rule::new("P4", "verb", "Start with a third-person verb")
            .with_spec(PhraseSpec::structural(StructuralCheck::ThirdPersonVerb)),
        Rule::new("P5", "blank", "No blank lines").with_spec(PhraseSpec::structural(StructuralCheck::BlankLine)),
        Rule::new("P6", "list", "Use a list element")
            .with_spec(PhraseSpec::structural(StructuralCheck::ManualList).scoped(TagKind::Remarks)),
    ]
}

fn entity() -> SourceEntity {
    SourceEntity::new(EntityKind::Method, "Exists")
        .with_type("bool")
        .with_containing_type("FileProbe")
}

fn parse(source: &str) -> CommentTree {
    parse_doc_comment(source, 0, BufferId(0)).unwrap()
}

/// Every located text run of `nodes` and its text.
fn located_runs(nodes: &[CommentNode], out: &mut Vec<(usize, usize, String)>) {
    for node in nodes {
        match node {
            CommentNode::Text(run) => {
                if let Some(span) = run.span {
                    out.push((span.start, span.end(), run.text.clone()));
                }
            }
            CommentNode::Element(element) => located_runs(&element.children, out),
        }
    }
}

// ============================================================================
// Span Properties
// ============================================================================

#[test]
fn finding_spans_slice_the_buffer() {
    for source in CORPUS {
        let tree = parse(source);
        for rule in rules() {
            for finding in evaluate(&rule, &entity(), &tree).unwrap() {
                let text = finding.span.slice(source);
                assert!(text.is_some(), "{} span out of range in {:?}", rule.id, source);
                assert_eq!(finding.span.generation, tree.generation);
                assert_eq!(finding.span.buffer, tree.buffer);
            }
        }
    }
}

#[test]
fn phrase_matches_respect_word_boundaries() {
    let rule = Rule::new("P8", "simply", "Avoid '{found}'")
        .with_spec(PhraseSpec::new(Position::None, ["simply", "just"]).all_occurrences());
    let sources = [
        "/// <summary>Simplyfy justice, simply adjust.</summary>",
        "/// <summary>Unjust simplyx; just.</summary>",
    ];
    for source in sources {
        let findings = evaluate(&rule, &entity(), &parse(source)).unwrap();
        assert_eq!(findings.len(), 1, "{:?}", source);
        for finding in findings {
            let before = source[..finding.span.start].chars().next_back();
            let after = source[finding.span.end()..].chars().next();
            assert!(!before.is_some_and(char::is_alphanumeric), "partial match in {:?}", source);
            assert!(!after.is_some_and(char::is_alphanumeric), "partial match in {:?}", source);
        }
    }
}

#[test]
fn rewritten_spans_slice_the_spliced_text() {
    for source in CORPUS {
        let tree = parse(source);
        for rule in rules() {
            let findings = evaluate(&rule, &entity(), &tree).unwrap();
            let fixable: Vec<_> = findings.into_iter().filter(|f| f.is_fixable()).collect();
            if fixable.is_empty() {
                continue;
            }
            let batch = apply_batch(&tree, &fixable).unwrap();
            let spliced = splice(source, &batch.rewrite.diff);
            let mut runs = Vec::new();
            located_runs(&batch.rewrite.tree.nodes, &mut runs);
            for (start, end, text) in runs {
                assert_eq!(spliced.get(start..end), Some(text.as_str()), "{} on {:?}", rule.id, source);
            }
        }
    }
}

// ============================================================================
// Fix Properties
// ============================================================================

#[test]
fn applying_every_fix_silences_the_rule() {
    for source in CORPUS {
        let tree = parse(source);
        for rule in rules() {
            let findings = evaluate(&rule, &entity(), &tree).unwrap();
            if findings.is_empty() || !findings.iter().all(|f| f.is_fixable()) {
                continue;
            }
            let batch = apply_batch(&tree, &findings).unwrap();
            assert!(batch.rejected.is_empty(), "{} rejected edits on {:?}", rule.id, source);
            let again = evaluate(&rule, &entity(), &batch.rewrite.tree).unwrap();
            assert!(again.is_empty(), "{} still fires after its fix on {:?}: {:?}", rule.id, source, again);
        }
    }
}

#[test]
fn fixed_comments_check_clean_of_fixable_findings() {
    let config = ResolvedConfig::resolve(None, &EnvOverrides::default(), &CliOverrides::default()).unwrap();
    let scanner = Scanner::new(rules(), &config);
    for source in CORPUS {
        let outcome = scanner.fix(&entity(), parse(source));
        let (again, _) = scanner.check(&entity(), &outcome.tree);
        assert!(
            again.iter().all(|f| !f.is_fixable()),
            "fixable findings left on {:?}: {:?}",
            source,
            again
        );
        assert_eq!(again, outcome.remaining);
    }
}

#[test]
fn proposal_preview_matches_applied_scope() {
    let source = CORPUS[0];
    let tree = parse(source);
    let findings = evaluate(&rules()[0], &entity(), &tree).unwrap();
    let rewrite = apply(&tree, &findings[0]).unwrap();
    let preview = &findings[0].proposal.as_ref().unwrap().preview;
    assert!(splice(source, &rewrite.diff).contains(preview.as_str()));
    assert_eq!(rewrite.tree.generation, tree.generation.next());
}

#[test]
fn findings_against_an_old_generation_are_rejected() {
    let source = CORPUS[2];
    let tree = parse(source);
    let findings = evaluate(&rules()[2], &entity(), &tree).unwrap();
    let rewrite = apply(&tree, &findings[0]).unwrap();
    assert!(matches!(apply(&rewrite.tree, &findings[0]), Err(RewriteError::Stale { .. })));
}

#[test]
fn overlapping_fixes_conflict_in_a_batch() {
    let other = Rule::new("P7", "value-prefix", "Start with '{phrase}'")
        .with_spec(PhraseSpec::new(Position::StartsWith, ["Gets a value indicating whether "]));
    let source = CORPUS[0];
    let tree = parse(source);
    let mut findings = evaluate(&rules()[0], &entity(), &tree).unwrap();
    findings.extend(evaluate(&other, &entity(), &tree).unwrap());
    assert_eq!(findings.len(), 2);

    let batch = apply_batch(&tree, &findings).unwrap();
    assert_eq!(batch.applied, vec![0]);
    assert_eq!(batch.rejected.len(), 1);
    assert!(matches!(batch.rejected[0].1, RewriteError::Conflict { .. }));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn evaluation_is_deterministic_and_ordered() {
    for source in CORPUS {
        let tree = parse(source);
        for rule in rules() {
            let first = evaluate(&rule, &entity(), &tree).unwrap();
            let second = evaluate(&rule, &entity(), &tree).unwrap();
            assert_eq!(first, second);
            assert!(first.windows(2).all(|w| w[0].span.start <= w[1].span.start));
            assert!(first.windows(2).all(|w| !w[0].span.overlaps(&w[1].span)));
        }
    }
}

#[test]
fn parallel_scan_matches_sequential_check() {
    let config = ResolvedConfig::resolve(None, &EnvOverrides::default(), &CliOverrides::default()).unwrap();
    let scanner = Scanner::new(rules(), &config);
    let items: Vec<ScanItem> = CORPUS
        .iter()
        .map(|source| ScanItem {
            entity: entity(),
            tree: parse(source),
        })
        .collect();

    let report = scanner.scan(&items, &CancellationToken::new());
    let sequential: Vec<_> = items
        .iter()
        .flat_map(|item| scanner.check(&item.entity, &item.tree).0)
        .collect();
    assert_eq!(report.findings, sequential);
    assert_eq!(report.entities_checked, CORPUS.len());
    assert!(!report.cancelled);
}
