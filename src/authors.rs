//! Author string normalization.
//!
//! Splits the free-text author field of a publication into individual people and
//! institutions. The parser never fails: fragments it cannot make sense of are
//! dropped and counted in [`AuthorParse::dropped`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}").expect("bracket pattern is valid")
});

static PRIMARY_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;\r\n]+").expect("separator pattern is valid"));

static AND_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s+)and(?:\s+|$)|&").expect("conjunction pattern is valid")
});

/// Honorifics and degrees, compared lowercase with dots removed
const TITLES: &[&str] = &[
    "dr", "prof", "professor", "mr", "mrs", "ms", "mx", "sir", "md", "phd", "mph", "mba", "msc",
    "mha", "mpp", "rn", "bsn", "msn", "drph", "jd", "scd", "dnp", "facp", "faan", "fache",
];

const ROLE_DESCRIPTORS: &[&str] = &[
    "principal investigator",
    "co-principal investigator",
    "co-investigator",
    "investigator",
    "et al",
    "et al.",
    "others",
    "+ others",
    "editor",
    "editors",
    "corresponding author",
    "lead author",
    "senior author",
    "author",
    "authors",
    "contributor",
    "contributors",
    "project director",
    "project officer",
    "research team",
    "staff",
];

const INSTITUTION_KEYWORDS: &[&str] = &[
    "university", "universidad", "college", "hospital", "hospitals", "department", "dept",
    "inc", "llc", "ltd", "corp", "corporation", "company", "institute", "institutes",
    "institution", "center", "centre", "centers", "agency", "foundation", "association",
    "school", "clinic", "council", "commission", "office", "organization", "administration",
    "services", "group", "consortium", "laboratory", "program", "board", "bureau", "society",
    "coalition", "committee", "system", "systems",
];

/// Also surnames, so they only mark institutions in names of three or more words
const CONTEXTUAL_KEYWORDS: &[&str] = &["trust", "network"];

/// Matched case-sensitively as whole tokens ("RAND", not "Rand")
const ACRONYM_KEYWORDS: &[&str] = &["RAND", "AHRQ", "CMS", "CDC", "NIH", "HHS", "KFF"];

const NAME_SUFFIXES: &[&str] = &["jr", "jr.", "sr", "sr.", "ii", "iii", "iv"];

/// Tokens shorter than this (in characters) are treated as noise
const MIN_TOKEN_CHARS: usize = 3;

/// Personal names longer than this many words are not parsed as people
const MAX_NAME_WORDS: usize = 5;

/// One individual or institution extracted from an author string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAuthor {
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_institution: bool,
}

impl ParsedAuthor {
    fn institution(name: String) -> Self {
        Self {
            full_name: name,
            first_name: None,
            last_name: None,
            is_institution: true,
        }
    }

    fn person(full_name: String, first_name: Option<String>, last_name: String) -> Self {
        Self {
            full_name,
            first_name,
            last_name: Some(last_name),
            is_institution: false,
        }
    }
}

/// Result of normalizing one author string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorParse {
    /// Deduplicated authors in order of first appearance
    pub authors: Vec<ParsedAuthor>,
    /// Fragments discarded as unparseable noise
    pub dropped: usize,
}

/// Shape of a raw author field, used by the data-quality report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorListFormat {
    Empty,
    /// Truncated list (`[+ others]`, `et al`)
    Abbreviated,
    Single,
    /// Whole list wrapped in brackets
    Bracketed,
    NeedsValidation,
    Complete,
}

/// Normalize a raw author string into deduplicated authors.
pub fn parse_authors(raw: &str) -> AuthorParse {
    let mut result = AuthorParse::default();
    if raw.trim().is_empty() {
        return result;
    }

    let without_brackets = BRACKETED.replace_all(raw, " ");
    let mut seen: HashSet<String> = HashSet::new();

    for segment in PRIMARY_SEPARATORS.split(&without_brackets) {
        for piece in split_conjunctions(segment) {
            match parse_token(piece) {
                Token::Author(author) => {
                    if seen.insert(author.full_name.to_lowercase()) {
                        result.authors.push(author);
                    }
                }
                Token::Noise => result.dropped += 1,
                Token::Skip => {}
            }
        }
    }

    result
}

/// Rebuild an author string from parsed names.
pub fn join_authors(authors: &[ParsedAuthor]) -> String {
    authors
        .iter()
        .map(|a| a.full_name.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Classify the raw author field the way the data-quality audit buckets it.
pub fn classify_author_list(raw: &str) -> AuthorListFormat {
    let authors = raw.trim();
    if authors.is_empty() {
        return AuthorListFormat::Empty;
    }
    if authors.contains("[+ others]") || authors.to_lowercase().contains("et al") {
        return AuthorListFormat::Abbreviated;
    }
    if !authors.contains(';') && authors.matches('.').count() <= 2 {
        return AuthorListFormat::Single;
    }
    if authors.starts_with('[') && authors.ends_with(']') {
        return AuthorListFormat::Bracketed;
    }
    if authors.chars().count() < 10 || !authors.contains(';') {
        return AuthorListFormat::NeedsValidation;
    }
    AuthorListFormat::Complete
}

/// Split a segment on "and"/"&".
///
/// In segments naming an institution, runs of pieces that are not personal
/// names are joined back, so "Department of Health and Human Services" stays
/// whole while "Jane Doe and Harvard University" yields both.
fn split_conjunctions(segment: &str) -> Vec<&str> {
    if !has_institution_keyword(segment) {
        return AND_SEPARATOR.split(segment).collect();
    }

    let mut spans = Vec::new();
    let mut start = 0;
    for m in AND_SEPARATOR.find_iter(segment) {
        spans.push((start, m.start()));
        start = m.end();
    }
    spans.push((start, segment.len()));

    let mut pieces = Vec::with_capacity(spans.len());
    let mut pending: Option<(usize, usize)> = None;
    for (start, end) in spans {
        let piece = &segment[start..end];
        if is_personal_name(piece) {
            if let Some((s, e)) = pending.take() {
                pieces.push(&segment[s..e]);
            }
            pieces.push(piece);
        } else {
            pending = Some(pending.map_or((start, end), |(s, _)| (s, end)));
        }
    }
    if let Some((s, e)) = pending {
        pieces.push(&segment[s..e]);
    }
    pieces
}

/// A multi-word name that parses as a person
fn is_personal_name(piece: &str) -> bool {
    matches!(
        parse_token(piece),
        Token::Author(author) if !author.is_institution && author.full_name.contains(' ')
    )
}

enum Token {
    Author(ParsedAuthor),
    Noise,
    Skip,
}

fn parse_token(piece: &str) -> Token {
    let cleaned = piece.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-' | '"' | '\'' | '*' | '+')
    });
    if cleaned.is_empty() {
        return Token::Skip;
    }

    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| !is_title(w))
        .collect();
    if words.is_empty() {
        return Token::Skip;
    }

    let token = words.join(" ");
    if is_role_descriptor(&token) {
        return Token::Skip;
    }

    if has_institution_keyword(&token) {
        return Token::Author(ParsedAuthor::institution(token));
    }

    if !token.chars().any(char::is_alphabetic) {
        return Token::Noise;
    }

    match words.len() {
        1 => {
            let word = words[0];
            if word.chars().count() < MIN_TOKEN_CHARS
                || is_suffix(word)
                || !is_name_word(word)
            {
                Token::Noise
            } else {
                Token::Author(ParsedAuthor::person(word.to_string(), None, word.to_string()))
            }
        }
        n if n <= MAX_NAME_WORDS && words.iter().all(|w| is_name_word(w)) => {
            Token::Author(parse_personal_name(&words))
        }
        _ => Token::Author(ParsedAuthor::institution(token)),
    }
}

/// Positional first/last extraction for 2-5 word personal names.
///
/// A trailing generational suffix stays attached to the last name.
fn parse_personal_name(words: &[&str]) -> ParsedAuthor {
    let first = words[0];
    let last = words[words.len() - 1];

    match words.len() {
        2 if is_initial(last) => {
            // "Becker C." lists the surname first; keep it as written
            ParsedAuthor::person(words.join(" "), None, first.to_string())
        }
        2 => ParsedAuthor::person(
            format!("{} {}", first, last),
            Some(first.to_string()),
            last.to_string(),
        ),
        n if n >= 3 && is_suffix(last) => {
            let last_name = format!("{} {}", words[n - 2], last);
            ParsedAuthor::person(
                format!("{} {}", first, last_name),
                Some(first.to_string()),
                last_name,
            )
        }
        _ => ParsedAuthor::person(
            format!("{} {}", first, last),
            Some(first.to_string()),
            last.to_string(),
        ),
    }
}

fn has_institution_keyword(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.iter().any(|word| {
        let bare = word.trim_matches(|c: char| !c.is_alphanumeric());
        if ACRONYM_KEYWORDS.contains(&bare) {
            return true;
        }
        let normalized = bare.to_lowercase();
        INSTITUTION_KEYWORDS.contains(&normalized.as_str())
            || (words.len() >= 3 && CONTEXTUAL_KEYWORDS.contains(&normalized.as_str()))
    })
}

fn is_title(word: &str) -> bool {
    let normalized: String = word
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .collect::<String>()
        .to_lowercase();
    TITLES.contains(&normalized.as_str())
}

fn is_role_descriptor(token: &str) -> bool {
    let lower = token.to_lowercase();
    ROLE_DESCRIPTORS
        .iter()
        .any(|role| lower == *role || lower.starts_with(&format!("{} ", role)))
}

fn is_suffix(word: &str) -> bool {
    NAME_SUFFIXES.contains(&word.to_lowercase().as_str())
}

fn is_name_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphabetic() || matches!(c, '.' | '\'' | '-' | '’'))
}

/// "C", "C.", "CJ", "C.J."
fn is_initial(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| *c != '.').collect();
    !letters.is_empty() && letters.len() <= 2 && letters.iter().all(|c| c.is_uppercase())
}
