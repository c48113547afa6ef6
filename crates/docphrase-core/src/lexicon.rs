//! Linguistic service: plurals, verb forms and articles for English words.
//!
//! Everything here is table-driven: a handful of suffix rules plus exception
//! tables that live in static data for the lifetime of the process. Unknown
//! words fall back to the regular rules (singular, third person by `-s`,
//! article `"a"` for consonant sounds).
//!
//! All functions accept words in any capitalization and return results in
//! the capitalization of their input where that makes sense.

// ============================================================================
// Tables
// ============================================================================

/// Irregular `(singular, plural)` pairs.
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("alias", "aliases"),
    ("analysis", "analyses"),
    ("axis", "axes"),
    ("child", "children"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("half", "halves"),
    ("index", "indices"),
    ("knife", "knives"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("man", "men"),
    ("matrix", "matrices"),
    ("medium", "media"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("person", "people"),
    ("radius", "radii"),
    ("self", "selves"),
    ("shelf", "shelves"),
    ("status", "statuses"),
    ("thief", "thieves"),
    ("tooth", "teeth"),
    ("vertex", "vertices"),
    ("wife", "wives"),
    ("wolf", "wolves"),
    ("woman", "women"),
];

/// Words whose singular and plural are the same.
const INVARIANT_NOUNS: &[&str] = &[
    "aircraft", "advice", "deer", "equipment", "feedback", "fish", "hardware", "information",
    "knowledge", "metadata", "money", "moose", "music", "news", "offspring", "research", "series",
    "sheep", "software", "species", "traffic",
];

/// Words ending in `o` that take `-es`.
const O_ES_WORDS: &[&str] = &["echo", "hero", "potato", "tomato", "veto", "torpedo"];

/// Irregular `(base, third person, past)` verb forms.
const IRREGULAR_VERBS: &[(&str, &str, &str)] = &[
    ("be", "is", "was"),
    ("begin", "begins", "began"),
    ("build", "builds", "built"),
    ("do", "does", "did"),
    ("find", "finds", "found"),
    ("get", "gets", "got"),
    ("go", "goes", "went"),
    ("have", "has", "had"),
    ("keep", "keeps", "kept"),
    ("leave", "leaves", "left"),
    ("make", "makes", "made"),
    ("run", "runs", "ran"),
    ("send", "sends", "sent"),
    ("throw", "throws", "threw"),
    ("write", "writes", "wrote"),
];

/// Words ending in `s` that are never a third-person verb form.
const NOT_THIRD_PERSON: &[&str] = &[
    "always", "as", "afterwards", "besides", "perhaps", "sometimes", "thus", "towards", "unless",
    "was", "whereas", "yes", "its", "his", "hers", "ours", "yours", "theirs", "less",
];

/// Words ending in `ing` that are not gerunds.
const NOT_GERUNDS: &[&str] = &[
    "anything", "bring", "ceiling", "during", "evening", "everything", "king", "morning",
    "nothing", "ring", "sibling", "sing", "something", "spring", "string", "swing", "thing",
    "wing",
];

/// Words ending in `ed` that are not past forms.
const NOT_PAST: &[&str] = &[
    "bed", "embed", "feed", "hundred", "indeed", "need", "red", "seed", "shed", "speed",
];

/// Common adjectives and adverbs without a telltale suffix.
const ADJECTIVES_AND_ADVERBS: &[&str] = &[
    "again", "already", "also", "current", "custom", "default", "different", "empty", "false",
    "first", "full", "given", "hidden", "internal", "invalid", "last", "main", "multiple", "new",
    "next", "null", "old", "only", "optional", "partial", "previous", "private", "public",
    "readonly", "required", "safe", "same", "single", "specified", "static", "true", "unique",
    "unsafe", "valid", "very", "visible", "whole",
];

/// Articles, determiners, pronouns, prepositions and conjunctions.
const FUNCTION_WORDS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "it", "its", "if", "when", "whether",
    "for", "to", "of", "in", "on", "by", "with", "from", "and", "or", "but", "not", "no", "all",
    "any", "each", "every", "some", "one", "we", "you", "they", "he", "she", "there", "here",
    "see", "note",
];

/// Nouns and verbs ending in `ly`.
const LY_NON_ADVERBS: &[&str] = &[
    "apply", "assembly", "family", "fly", "imply", "ply", "rely", "reply", "supply", "anomaly",
];

/// Words starting with a vowel letter but a consonant sound.
const CONSONANT_SOUND_PREFIXES: &[&str] = &["eu", "ewe", "one", "once", "ubiq", "use", "usu", "uti", "ura"];

/// Words starting with a silent `h`.
const VOWEL_SOUND_WORDS: &[&str] = &["heir", "honest", "honor", "honour", "hour", "hourly"];

/// Identifier prefixes read letter by letter (`an XmlReader`, `a UriBuilder`).
const ACRONYM_PREFIXES: &[&str] = &[
    "fbi", "ftp", "hmac", "html", "http", "json", "led", "mvc", "rgb", "rsa", "sdk", "smtp", "sql",
    "ssh", "ssl", "svg", "tcp", "udp", "uri", "url", "xaml", "xml", "xslt", "yaml",
];

/// Letters whose spoken name starts with a vowel sound.
const VOWEL_NAMED_LETTERS: &str = "aefhilmnorsx";

/// Stem endings that lost a final `e` before `-ing`/`-ed`.
const E_DROPPING_ENDINGS: &[&str] = &[
    "ad", "ag", "ak", "ar", "at", "ic", "id", "ir", "iv", "iz", "ok", "os", "ot", "ov", "uc",
    "ud", "ur", "us", "ut",
];

/// `e`-final verbs whose stem the suffix heuristics misread (`creat`, `delet`).
const E_FINAL_VERBS: &[&str] = &[
    "acquire", "cache", "combine", "compare", "complete", "compute", "configure", "create",
    "declare", "define", "delete", "describe", "determine", "dispose", "examine", "execute",
    "ignore", "invoke", "queue", "release", "require", "restore", "retrieve", "store", "write",
];

/// Verbs that really end in a doubled consonant.
const DOUBLE_FINAL_VERBS: &[&str] = &["add", "err", "egg"];

const E_DROPPING_CLUSTERS: &[&str] = &[
    "bl", "cl", "dg", "dl", "gl", "kl", "ls", "lv", "nc", "ns", "ps", "pl", "rc", "rg", "rs", "rv",
    "tl", "zl",
];

// ============================================================================
// Helpers
// ============================================================================

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !is_vowel(c)
}

fn last_two(word: &str) -> Option<(char, char)> {
    let mut chars = word.chars().rev();
    let last = chars.next()?;
    let before = chars.next()?;
    Some((before, last))
}

/// Capitalization style of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseStyle {
    #[default]
    Lower,
    Title,
}

/// Uppercase the first character.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character.
pub fn decapitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// At least two letters, all of them uppercase (`URL`, `IO`, `HTTP2`).
pub fn is_acronym(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

/// Looks like a code identifier rather than an English word: inner
/// capitals (`FileName`), underscores, digits or member access.
pub fn is_identifier(word: &str) -> bool {
    let core = word.trim_end_matches(|c: char| c.is_ascii_punctuation());
    core.chars().skip(1).any(char::is_uppercase)
        || core.contains('_')
        || core.contains('.')
        || core.contains('<')
        || core.chars().any(|c| c.is_ascii_digit())
}

/// Copy the capitalization of `template` onto `replacement`.
///
/// An all-caps template yields an all-caps replacement; otherwise only the
/// first character's case is transferred.
pub fn match_case(template: &str, replacement: &str) -> String {
    if template.chars().filter(|c| c.is_alphabetic()).count() > 1 && is_acronym(template) {
        return replacement.to_uppercase();
    }
    match template.chars().next() {
        Some(c) if c.is_uppercase() => capitalize(replacement),
        Some(c) if c.is_lowercase() => decapitalize(replacement),
        _ => replacement.to_string(),
    }
}

/// Split `FileInfo` into (`File`, `Info`); words without inner capitals
/// return an empty head.
fn split_camel_tail(word: &str) -> (&str, &str) {
    let split = word
        .char_indices()
        .skip(1)
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last();
    match split {
        Some(i) if !is_acronym(word) => (&word[..i], &word[i..]),
        _ => ("", word),
    }
}

// ============================================================================
// Nouns
// ============================================================================

/// True for words with identical singular and plural (`series`, `metadata`).
pub fn is_singular_and_plural(word: &str) -> bool {
    let lower = word.to_lowercase();
    INVARIANT_NOUNS.contains(&lower.as_str())
}

/// Plural form of a noun. CamelCase identifiers pluralize their last word.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || !word.ends_with(|c: char| c.is_alphabetic()) {
        return word.to_string();
    }
    let (head, tail) = split_camel_tail(word);
    if !head.is_empty() {
        return format!("{}{}", head, pluralize(tail));
    }
    if is_acronym(word) {
        return format!("{}s", word);
    }

    let lower = word.to_lowercase();
    if is_singular_and_plural(&lower) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR_PLURALS.iter().find(|(s, _)| *s == lower) {
        return match_case(word, plural);
    }
    if IRREGULAR_PLURALS.iter().any(|(_, p)| *p == lower) {
        return word.to_string();
    }

    let plural = if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
        || O_ES_WORDS.contains(&lower.as_str())
    {
        format!("{}es", lower)
    } else if matches!(last_two(&lower), Some((b, 'y')) if is_consonant(b)) {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    };
    restore_case(word, &plural)
}

/// Re-apply the case of `original` to a suffix-derived form of it.
fn restore_case(original: &str, derived: &str) -> String {
    if is_acronym(original) {
        return derived.to_uppercase();
    }
    // Keep the original prefix verbatim where it survives. Case mapping may
    // change a character's width, so each side keeps its own byte offset.
    let (kept, replaced) = original
        .char_indices()
        .zip(derived.char_indices())
        .take_while(|((_, a), (_, b))| a.to_lowercase().eq(b.to_lowercase()))
        .last()
        .map(|((i, a), (j, b))| (i + a.len_utf8(), j + b.len_utf8()))
        .unwrap_or((0, 0));
    format!("{}{}", &original[..kept], &derived[replaced..])
}

/// True if `word` reads as a plural noun (`files`, `children`, `metadata`).
pub fn is_plural(word: &str) -> bool {
    let (_, tail) = split_camel_tail(word);
    let lower = tail.to_lowercase();
    if lower.is_empty() {
        return false;
    }
    if is_singular_and_plural(&lower) || IRREGULAR_PLURALS.iter().any(|(_, p)| *p == lower) {
        return true;
    }
    if IRREGULAR_PLURALS.iter().any(|(s, _)| *s == lower) {
        return false;
    }
    if tail.ends_with('s') && tail.len() > 1 && is_acronym(&tail[..tail.len() - 1]) {
        return true;
    }
    lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("us") && !lower.ends_with("is")
}

// ============================================================================
// Verbs
// ============================================================================

/// True for third-person singular present forms (`gets`, `copies`, `is`).
pub fn is_third_person_singular_verb(word: &str) -> bool {
    let lower = word.to_lowercase();
    if IRREGULAR_VERBS.iter().any(|(_, third, _)| *third == lower) {
        return true;
    }
    if NOT_THIRD_PERSON.contains(&lower.as_str()) || lower.len() < 3 {
        return false;
    }
    lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("us") && !lower.ends_with("is")
}

/// Third-person singular of a base verb (`get` -> `gets`, `copy` -> `copies`).
pub fn conjugate_third_person_singular(verb: &str) -> String {
    if verb.is_empty() {
        return String::new();
    }
    let lower = verb.to_lowercase();
    if let Some((_, third, _)) = IRREGULAR_VERBS.iter().find(|(base, _, _)| *base == lower) {
        return match_case(verb, third);
    }
    let third = if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
        || lower.ends_with('o')
    {
        format!("{}es", lower)
    } else if matches!(last_two(&lower), Some((b, 'y')) if is_consonant(b)) {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    };
    restore_case(verb, &third)
}

/// Undo consonant doubling and `e` dropping on a stem left by `-ing`/`-ed`.
fn repair_stem(stem: &str) -> String {
    let restored = format!("{}e", stem);
    if E_FINAL_VERBS.contains(&restored.as_str()) || stem.ends_with('u') {
        return restored;
    }
    if DOUBLE_FINAL_VERBS.contains(&stem) {
        return stem.to_string();
    }
    if let Some((a, b)) = last_two(stem) {
        if a == b && is_consonant(b) && !matches!(b, 'l' | 's' | 'z' | 'f') {
            return stem[..stem.len() - 1].to_string();
        }
    }
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();
    if n >= 2 {
        let ending: String = chars[n - 2..].iter().collect();
        let before_is_consonant = n < 3 || !is_vowel(chars[n - 3]);
        if (E_DROPPING_ENDINGS.contains(&ending.as_str()) && before_is_consonant)
            || E_DROPPING_CLUSTERS.contains(&ending.as_str())
            || is_short_closed_syllable(&chars)
        {
            return restored;
        }
    }
    stem.to_string()
}

/// One vowel group, closed by a single vowel and a consonant (`writ`,
/// `stor`, `cod`). Such stems would have doubled their consonant had the
/// base not ended in `e`.
fn is_short_closed_syllable(chars: &[char]) -> bool {
    let n = chars.len();
    if n < 3 {
        return false;
    }
    let (vowel, last) = (chars[n - 2], chars[n - 1]);
    if !is_vowel(vowel) || !is_consonant(last) || matches!(last, 'w' | 'x' | 'y') || is_vowel(chars[n - 3]) {
        return false;
    }
    let groups = chars
        .iter()
        .enumerate()
        .filter(|(i, c)| is_vowel(**c) && (*i == 0 || !is_vowel(chars[i - 1])))
        .count();
    groups == 1
}

/// Base form of a verb given as gerund, third person or past (`getting`,
/// `copies`, `created` -> `get`, `copy`, `create`). Base forms and unknown
/// words are returned unchanged.
pub fn base_form(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some((base, _, _)) = IRREGULAR_VERBS
        .iter()
        .find(|(_, third, past)| *third == lower || *past == lower)
    {
        return match_case(word, base);
    }

    let base = if is_gerund(&lower) {
        repair_stem(&lower[..lower.len() - 3])
    } else if is_past_tense(&lower) {
        if lower.ends_with("ied") {
            format!("{}y", &lower[..lower.len() - 3])
        } else {
            repair_stem(&lower[..lower.len() - 2])
        }
    } else if is_third_person_singular_verb(&lower) {
        if lower.ends_with("ies") && lower.len() > 4 {
            format!("{}y", &lower[..lower.len() - 3])
        } else if ["sses", "shes", "ches", "xes", "zzes", "oes"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
        {
            lower[..lower.len() - 2].to_string()
        } else {
            lower[..lower.len() - 1].to_string()
        }
    } else {
        return word.to_string();
    };
    match_case(word, &base)
}

/// True for `-ing` forms (`getting`, `creating`).
pub fn is_gerund(word: &str) -> bool {
    let lower = word.to_lowercase();
    lower.len() > 4 && lower.ends_with("ing") && !NOT_GERUNDS.contains(&lower.as_str())
}

/// True for regular `-ed` forms and irregular pasts (`created`, `found`).
pub fn is_past_tense(word: &str) -> bool {
    let lower = word.to_lowercase();
    if IRREGULAR_VERBS.iter().any(|(_, _, past)| *past == lower) {
        return true;
    }
    lower.len() > 3 && lower.ends_with("ed") && !NOT_PAST.contains(&lower.as_str())
}

// ============================================================================
// Modifiers and Articles
// ============================================================================

/// True for common adjectives and adverbs (`valid`, `readable`, `quickly`).
pub fn is_adjective_or_adverb(word: &str) -> bool {
    let lower = word.to_lowercase();
    if ADJECTIVES_AND_ADVERBS.contains(&lower.as_str()) {
        return true;
    }
    if lower.len() > 3 && lower.ends_with("ly") && !LY_NON_ADVERBS.contains(&lower.as_str()) {
        return true;
    }
    lower.len() > 5
        && ["able", "ible", "ful", "less", "ous", "ive"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
}

/// True for articles, determiners, pronouns, prepositions and conjunctions.
pub fn is_function_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    let lower = lower.trim_end_matches(|c: char| c.is_ascii_punctuation());
    FUNCTION_WORDS.contains(&lower)
}

fn vowel_sound_by_letter_name(c: char) -> bool {
    VOWEL_NAMED_LETTERS.contains(c.to_ascii_lowercase())
}

fn numeral_article_is_an(word: &str) -> bool {
    let digits: String = word.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.starts_with('8') {
        return true;
    }
    (digits.starts_with("11") || digits.starts_with("18")) && digits.len() % 3 == 2
}

fn starts_with_vowel_sound(word: &str) -> bool {
    let Some(first) = word.chars().next() else {
        return false;
    };
    if first.is_ascii_digit() {
        return numeral_article_is_an(word);
    }
    let lower = word.to_lowercase();
    if is_acronym(word) || (first.is_uppercase() && word.chars().nth(1).is_some_and(char::is_uppercase)) {
        return vowel_sound_by_letter_name(first);
    }
    if ACRONYM_PREFIXES.iter().any(|p| lower.starts_with(p)) && first.is_uppercase() {
        return vowel_sound_by_letter_name(first);
    }
    if VOWEL_SOUND_WORDS.iter().any(|w| lower.starts_with(w)) {
        return true;
    }
    if CONSONANT_SOUND_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return false;
    }
    if let Some(rest) = lower.strip_prefix("uni") {
        return !rest.starts_with(['c', 'q', 'f', 'o', 't', 'v', 's', 'l']);
    }
    is_vowel(lower.chars().next().unwrap_or('b'))
}

/// Indefinite article for `word`: `"a"`, `"an"`, or `""` for empty or plural words.
pub fn article_for(word: &str, style: CaseStyle) -> &'static str {
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() || (!is_acronym(word) && is_plural(word)) {
        return "";
    }
    match (starts_with_vowel_sound(word), style) {
        (true, CaseStyle::Lower) => "an",
        (true, CaseStyle::Title) => "An",
        (false, CaseStyle::Lower) => "a",
        (false, CaseStyle::Title) => "A",
    }
}

/// `word` preceded by its article, or alone when it takes none.
pub fn with_article(word: &str, style: CaseStyle) -> String {
    match article_for(word, style) {
        "" => word.to_string(),
        article => format!("{} {}", article, word),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod noun_tests {
        use super::*;

        #[test]
        fn plural_detection() {
            assert!(is_plural("files"));
            assert!(is_plural("children"));
            assert!(is_plural("URLs"));
            assert!(!is_plural("status"));
            assert!(!is_plural("class"));
            assert!(!is_plural("analysis"));
            assert!(!is_plural("file"));
        }

        #[test]
        fn pluralize_regular_and_irregular() {
            assert_eq!(pluralize("file"), "files");
            assert_eq!(pluralize("class"), "classes");
            assert_eq!(pluralize("box"), "boxes");
            assert_eq!(pluralize("entry"), "entries");
            assert_eq!(pluralize("key"), "keys");
            assert_eq!(pluralize("child"), "children");
            assert_eq!(pluralize("Index"), "Indices");
            assert_eq!(pluralize("series"), "series");
        }

        #[test]
        fn pluralize_identifiers() {
            assert_eq!(pluralize("FileInfo"), "FileInfos");
            assert_eq!(pluralize("HttpProxy"), "HttpProxies");
            assert_eq!(pluralize("URL"), "URLs");
            assert_eq!(pluralize("List<int>"), "List<int>");
        }

        #[test]
        fn pluralize_keeps_case_across_width_changes() {
            // U+023A lowercases to a three-byte character.
            assert_eq!(pluralize("Ⱥé"), "Ⱥés");
            assert_eq!(pluralize("Ⱥ"), "Ⱥs");
        }

        #[test]
        fn pluralized_words_are_plural() {
            for word in ["file", "class", "entry", "child", "status", "hero", "Matrix"] {
                assert!(is_plural(&pluralize(word)), "{}", word);
            }
        }
    }

    mod verb_tests {
        use super::*;

        #[test]
        fn third_person_detection() {
            assert!(is_third_person_singular_verb("Gets"));
            assert!(is_third_person_singular_verb("is"));
            assert!(is_third_person_singular_verb("copies"));
            assert!(!is_third_person_singular_verb("Get"));
            assert!(!is_third_person_singular_verb("This"));
            assert!(!is_third_person_singular_verb("Process"));
            assert!(!is_third_person_singular_verb("always"));
        }

        #[test]
        fn conjugation() {
            assert_eq!(conjugate_third_person_singular("Get"), "Gets");
            assert_eq!(conjugate_third_person_singular("copy"), "copies");
            assert_eq!(conjugate_third_person_singular("destroy"), "destroys");
            assert_eq!(conjugate_third_person_singular("process"), "processes");
            assert_eq!(conjugate_third_person_singular("fix"), "fixes");
            assert_eq!(conjugate_third_person_singular("have"), "has");
            assert_eq!(conjugate_third_person_singular("Be"), "Is");
        }

        #[test]
        fn conjugated_forms_are_third_person() {
            for verb in ["get", "copy", "process", "fix", "focus", "go", "be", "echo", "touch", "buzz"] {
                let third = conjugate_third_person_singular(verb);
                assert!(is_third_person_singular_verb(&third), "{} -> {}", verb, third);
            }
        }

        #[test]
        fn base_forms() {
            assert_eq!(base_form("Gets"), "Get");
            assert_eq!(base_form("copies"), "copy");
            assert_eq!(base_form("passes"), "pass");
            assert_eq!(base_form("getting"), "get");
            assert_eq!(base_form("Validating"), "Validate");
            assert_eq!(base_form("parsing"), "parse");
            assert_eq!(base_form("calling"), "call");
            assert_eq!(base_form("validated"), "validate");
            assert_eq!(base_form("copied"), "copy");
            assert_eq!(base_form("opened"), "open");
            assert_eq!(base_form("found"), "find");
            assert_eq!(base_form("Return"), "Return");
        }

        #[test]
        fn base_forms_restore_dropped_e() {
            assert_eq!(base_form("Creating"), "Create");
            assert_eq!(base_form("deleting"), "delete");
            assert_eq!(base_form("Storing"), "Store");
            assert_eq!(base_form("writing"), "write");
            assert_eq!(base_form("Queuing"), "Queue");
            assert_eq!(base_form("queued"), "queue");
            assert_eq!(base_form("coding"), "code");
            assert_eq!(base_form("adding"), "add");
            assert_eq!(base_form("visiting"), "visit");
            assert_eq!(base_form("reading"), "read");
        }

        #[test]
        fn gerunds_conjugate_to_third_person() {
            for (gerund, third) in [
                ("Creating", "Creates"),
                ("Deleting", "Deletes"),
                ("Storing", "Stores"),
                ("Writing", "Writes"),
                ("Queuing", "Queues"),
                ("Getting", "Gets"),
            ] {
                let verb = conjugate_third_person_singular(&base_form(gerund));
                assert_eq!(verb, third);
                assert!(is_third_person_singular_verb(&verb), "{}", verb);
            }
        }

        #[test]
        fn gerund_and_past_detection() {
            assert!(is_gerund("Getting"));
            assert!(!is_gerund("string"));
            assert!(is_past_tense("created"));
            assert!(is_past_tense("built"));
            assert!(!is_past_tense("speed"));
        }
    }

    mod article_tests {
        use super::*;

        #[test]
        fn vowel_and_consonant_sounds() {
            assert_eq!(article_for("elephant", CaseStyle::Lower), "an");
            assert_eq!(article_for("unicorn", CaseStyle::Lower), "a");
            assert_eq!(article_for("hour", CaseStyle::Lower), "an");
            assert_eq!(article_for("user", CaseStyle::Lower), "a");
            assert_eq!(article_for("uninitialized", CaseStyle::Lower), "an");
            assert_eq!(article_for("value", CaseStyle::Title), "A");
            assert_eq!(article_for("object", CaseStyle::Title), "An");
        }

        #[test]
        fn acronyms_use_letter_names() {
            assert_eq!(article_for("URL", CaseStyle::Lower), "a");
            assert_eq!(article_for("HTML", CaseStyle::Lower), "an");
            assert_eq!(article_for("IEnumerable", CaseStyle::Lower), "an");
            assert_eq!(article_for("XmlReader", CaseStyle::Lower), "an");
            assert_eq!(article_for("UriBuilder", CaseStyle::Lower), "a");
        }

        #[test]
        fn plural_and_empty_take_no_article() {
            assert_eq!(article_for("", CaseStyle::Lower), "");
            assert_eq!(article_for("files", CaseStyle::Lower), "");
            assert_eq!(with_article("files", CaseStyle::Lower), "files");
            assert_eq!(with_article("Stream", CaseStyle::Lower), "a Stream");
        }

        #[test]
        fn numerals() {
            assert_eq!(article_for("8-bit", CaseStyle::Lower), "an");
            assert_eq!(article_for("11", CaseStyle::Lower), "an");
            assert_eq!(article_for("16-bit", CaseStyle::Lower), "a");
        }
    }

    mod case_tests {
        use super::*;

        #[test]
        fn match_case_copies_capitalization() {
            assert_eq!(match_case("Checks", "determines"), "Determines");
            assert_eq!(match_case("checks", "Determines"), "determines");
            assert_eq!(match_case("EG", "for example"), "FOR EXAMPLE");
        }

        #[test]
        fn identifiers_and_acronyms() {
            assert!(is_identifier("FileName"));
            assert!(is_identifier("max_count"));
            assert!(!is_identifier("Checks"));
            assert!(is_acronym("URL"));
            assert!(!is_acronym("A"));
        }

        #[test]
        fn adjectives_and_adverbs() {
            assert!(is_adjective_or_adverb("quickly"));
            assert!(is_adjective_or_adverb("readable"));
            assert!(is_adjective_or_adverb("valid"));
            assert!(!is_adjective_or_adverb("apply"));
            assert!(!is_adjective_or_adverb("file"));
        }

        #[test]
        fn function_words() {
            assert!(is_function_word("The"));
            assert!(is_function_word("if,"));
            assert!(!is_function_word("Returns"));
        }
    }
}
