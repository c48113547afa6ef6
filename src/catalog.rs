//! Built-in phrasing rules.
//!
//! Rule ids are stable (`DP0001`...) so configuration can disable or
//! re-rank them by glob. Extra rules loaded from JSON are appended after the
//! built-ins and must not reuse their ids.

use docphrase_core::config::DEFAULT_MAX_SENTENCE_WORDS;
use docphrase_core::rule::{load_rules, PhraseSpec, RewriteStrategy, RuleError, StructuralCheck};
use docphrase_core::tree::TagKind;
use docphrase_core::{Position, Rule, Severity};

/// Sentence delimiters used by the sentence length rule.
const SENTENCE_DELIMITERS: &str = ".!?";

/// The built-in rules, in evaluation order.
pub fn builtin_rules() -> Result<Vec<Rule>, RuleError> {
    Ok(vec![
        Rule::new("DP0001", "bool-method-summary", "Summary should start with '{phrase}'")
            .described("Summaries of methods returning bool start with 'Determines whether'.")
            .applies_to("kind=method and type=bool")?
            .with_spec(
                PhraseSpec::new(Position::StartsWith, ["Determines whether "])
                    .with_replacements([
                        ("Returns true if ", "Determines whether "),
                        ("Returns whether ", "Determines whether "),
                        ("Checks whether ", "Determines whether "),
                        ("Checks if ", "Determines whether "),
                    ])
                    .with_ignorable_prefixes(["Asynchronously "]),
            ),
        Rule::new("DP0002", "read-write-property-summary", "Summary should start with '{phrase}'")
            .described("Summaries of read-write properties start with 'Gets or sets'.")
            .applies_to("kind=property and getter=true and setter=true")?
            .with_spec(
                PhraseSpec::new(Position::StartsWith, ["Gets or sets "])
                    .with_replacements([("Gets ", "Gets or sets "), ("Sets ", "Gets or sets ")]),
            ),
        Rule::new("DP0003", "read-only-property-summary", "Summary should start with '{phrase}'")
            .described("Summaries of read-only properties start with 'Gets'.")
            .applies_to("kind=property and getter=true and setter=false")?
            .with_spec(
                PhraseSpec::new(Position::StartsWith, ["Gets "])
                    .with_replacements([("Returns ", "Gets ")]),
            ),
        Rule::new("DP0004", "latin-abbreviation", "Spell out '{found}'")
            .described("Latin abbreviations are spelled out.")
            .with_severity(Severity::Suggestion)
            .with_spec(
                PhraseSpec::new(Position::None, Vec::<String>::new())
                    .with_replacements([("e.g.", "for example"), ("i.e.", "that is")])
                    .all_occurrences(),
            )
            .with_spec(
                PhraseSpec::new(Position::None, Vec::<String>::new())
                    .with_replacements([("e.g.", "for example"), ("i.e.", "that is")])
                    .scoped(TagKind::Remarks)
                    .all_occurrences(),
            ),
        Rule::new("DP0005", "boilerplate-property-summary", "Summary of {name} only restates its name")
            .described("Property summaries say more than 'Gets the <name>.'.")
            .with_severity(Severity::Suggestion)
            .applies_to("kind=property")?
            .with_spec(
                PhraseSpec::new(Position::Equals, ["Gets the {name}.", "Gets or sets the {name}."]).ignoring_case(),
            ),
        Rule::new("DP0006", "unused-parameter-docs", "{name} is documented as unused but still used")
            .described("Parameters documented as unused are not read.")
            .applies_to("kind=parameter and used=true")?
            .with_spec(
                PhraseSpec::new(Position::Equals, ["unused", "unused.", "not used", "not used."])
                    .scoped(TagKind::Param)
                    .ignoring_case(),
            ),
        Rule::new("DP0007", "summary-period", "Summary should end with a period")
            .described("Summaries end with terminal punctuation.")
            .with_spec(PhraseSpec::new(Position::EndsWith, [".", "!", "?"])),
        Rule::new("DP0008", "third-person-verb", "Summary should start with a third-person verb")
            .described("Method summaries start with a verb like 'Gets' or 'Creates'.")
            .applies_to("kind=method")?
            .with_spec(PhraseSpec::structural(StructuralCheck::ThirdPersonVerb)),
        Rule::new("DP0009", "sentence-length", "Sentence is too long: '{found}'")
            .described("Sentences stay under the configured word count.")
            .with_severity(Severity::Info)
            .with_spec(PhraseSpec::structural(sentence_length()))
            .with_spec(PhraseSpec::structural(sentence_length()).scoped(TagKind::Remarks)),
        Rule::new("DP0010", "blank-line", "Summary contains a blank line")
            .described("Summaries have no stray blank lines.")
            .with_spec(PhraseSpec::structural(StructuralCheck::BlankLine)),
        Rule::new("DP0011", "manual-list", "Use a <list> element instead of manual bullets")
            .described("Bulleted lines in remarks become list elements.")
            .with_severity(Severity::Suggestion)
            .with_spec(PhraseSpec::structural(StructuralCheck::ManualList).scoped(TagKind::Remarks)),
        Rule::new("DP0012", "this-type-summary", "Summary should describe {name} directly, not '{found}'")
            .described("Type summaries do not open with 'This class' or 'This type'.")
            .with_severity(Severity::Suggestion)
            .applies_to("kind=type")?
            .with_spec(
                PhraseSpec::new(
                    Position::None,
                    ["This class", "This type", "This struct", "This interface", "This enum"],
                )
                .ignoring_case(),
            )
            .with_strategy(RewriteStrategy::ReportOnly),
    ])
}

fn sentence_length() -> StructuralCheck {
    StructuralCheck::SentenceLength {
        max_words: DEFAULT_MAX_SENTENCE_WORDS,
        delimiters: SENTENCE_DELIMITERS.to_string(),
    }
}

/// Built-in rules followed by the rules in `extra_json`, all validated.
pub fn load_catalog(extra_json: Option<&str>) -> Result<Vec<Rule>, RuleError> {
    let mut rules = builtin_rules()?;
    if let Some(json) = extra_json {
        for rule in load_rules(json)? {
            if rules.iter().any(|r| r.id == rule.id) {
                return Err(RuleError::DuplicateId(rule.id));
            }
            rules.push(rule);
        }
    }
    for rule in &rules {
        rule.validate()?;
    }
    Ok(rules)
}

// ============================================================================
// Tests
// ============================================================================
