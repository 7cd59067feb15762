//! Season expression parsing.
//!
//! Turns the free-form season text a chat assistant passes along ("seasons 1
//! to 5", "season two", "remaining seasons") into a [`SeasonExpression`].
//! Parsing is total: text that cannot be understood becomes
//! [`SeasonExpression::Invalid`] with a diagnostic instead of a guess.
//!
//! Word numbers are supported from one through twelve. Anything larger has to
//! be written with digits.

use std::collections::BTreeSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Highest season number accepted from user text.
pub const MAX_SEASON_NUMBER: u32 = 999;

/// Diagnostic used when nothing in the text resembles a season reference.
pub const UNPARSEABLE: &str = "unparseable season expression";

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

static ALL_SEASONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:all\s+(?:of\s+)?(?:the\s+)?seasons|every\s+season|entire\s+(?:series|show)|whole\s+(?:series|show)|complete\s+(?:series|show))\b|^all(?:\s+of\s+them)?$",
    )
    .expect("all-seasons regex should compile")
});

static REMAINING_SEASONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(?:remaining|missing|other)\s+seasons?|rest\s+of\s+(?:the\s+)?(?:seasons|series|show))\b|^(?:the\s+)?(?:remaining|missing|rest)$",
    )
    .expect("remaining-seasons regex should compile")
});

static NEXT_SEASON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bnext\s+season\b|^next$").expect("next-season regex should compile")
});

static RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9]+)\s*(?:-|\bto\b|\bthrough\b|\bthru\b)\s*([a-z0-9]+)$")
        .expect("range regex should compile")
});

static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:[,;&+]|\band\b)\s*").expect("list separator regex should compile")
});

static NUMERIC_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:seasons?|s)?(\d+)(?:st|nd|rd|th)?$").expect("numeric token regex should compile")
});

static NEGATIVE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[,(]\s*|\bseasons?\s+)-\d").expect("negative number regex should compile")
});

static DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("digits regex should compile"));

/// A range anywhere in the text, e.g. "from season 2 to 4 if possible".
static LOOSE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([a-z0-9]+)\s*(?:-|\bto\b|\bthrough\b|\bthru\b)\s*(?:seasons?\s+)?([a-z0-9]+)\b")
        .expect("loose range regex should compile")
});

/// "s02e05" names season 2.
static EPISODE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bs(\d{1,3})\s*e\d{1,4}\b").expect("episode code regex should compile")
});

/// Numbers that are not season numbers: quality tags and episode numbers.
static NOT_A_SEASON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{3,4}p|\d+k|(?:episodes?|eps?|e)\s*\d+)\b")
        .expect("non-season number regex should compile")
});

static LEADING_SEASON_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<season>(?:the\s+)?(?:(?:all|remaining|missing|next|other)\s+(?:of\s+the\s+)?seasons?|rest\s+of\s+the\s+seasons|seasons?\s+[a-z0-9][a-z0-9 ,&\-]*?))\s+(?:of|from)\s+(?P<title>.+)$",
    )
    .expect("leading season phrase regex should compile")
});

static TRAILING_SEASON_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<title>.+?)[\s,:\-–]+(?P<season>(?:(?:all|remaining|missing|next|other)\s+seasons?|seasons?\s+[a-z0-9][a-z0-9 ,&\-]*|s\d{1,3}))$",
    )
    .expect("trailing season phrase regex should compile")
});

const FILLER_WORDS: &[&str] = &["season", "seasons", "the", "of", "please", "just", "only"];

const WORD_NUMBERS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("first", 1),
    ("second", 2),
    ("third", 3),
    ("fourth", 4),
    ("fifth", 5),
    ("sixth", 6),
    ("seventh", 7),
    ("eighth", 8),
    ("ninth", 9),
    ("tenth", 10),
    ("eleventh", 11),
    ("twelfth", 12),
];

/// Parsed form of a user's season request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SeasonExpression {
    /// No season text was given; season 1 applies.
    Unspecified,
    /// Concrete, positive season numbers.
    Explicit(BTreeSet<u32>),
    /// Every season the show has.
    AllSeasons,
    /// Every season not yet requested or available.
    RemainingSeasons,
    /// The lowest season not yet requested or available.
    NextSeason,
    /// The text could not be understood.
    Invalid(String),
}

impl SeasonExpression {
    /// Build an explicit expression from season numbers.
    pub fn explicit(seasons: impl IntoIterator<Item = u32>) -> Self {
        SeasonExpression::Explicit(seasons.into_iter().collect())
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, SeasonExpression::Invalid(_))
    }

    /// True for the variants whose seasons are only known after reconciliation.
    pub fn resolves_against_catalog(&self) -> bool {
        matches!(
            self,
            SeasonExpression::RemainingSeasons | SeasonExpression::NextSeason
        )
    }
}

impl fmt::Display for SeasonExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonExpression::Unspecified => write!(f, "season 1 (default)"),
            SeasonExpression::Explicit(seasons) => write!(f, "{}", describe_seasons(seasons)),
            SeasonExpression::AllSeasons => write!(f, "all seasons"),
            SeasonExpression::RemainingSeasons => write!(f, "remaining seasons"),
            SeasonExpression::NextSeason => write!(f, "next season"),
            SeasonExpression::Invalid(reason) => write!(f, "invalid ({})", reason),
        }
    }
}

/// Render season numbers for a sentence: "season 2", "seasons 1, 3 and 5".
pub fn describe_seasons<'a>(seasons: impl IntoIterator<Item = &'a u32>) -> String {
    let numbers: Vec<String> = seasons.into_iter().map(|s| s.to_string()).collect();
    match numbers.as_slice() {
        [] => "no seasons".to_string(),
        [only] => format!("season {}", only),
        [init @ .., last] => format!("seasons {} and {}", init.join(", "), last),
    }
}

/// Parse free-form season text.
pub fn parse(text: &str) -> SeasonExpression {
    let expression = parse_normalized(&normalize(text));
    debug!("Parsed season text '{}' as {}", text, expression);
    expression
}

fn normalize(text: &str) -> String {
    WHITESPACE
        .replace_all(text.trim(), " ")
        .to_ascii_lowercase()
        .replace(['–', '—'], "-")
        .trim_matches(|c: char| c == '.' || c == '!' || c == '?')
        .trim()
        .to_string()
}

fn parse_normalized(text: &str) -> SeasonExpression {
    if text.is_empty() {
        return SeasonExpression::Unspecified;
    }
    if ALL_SEASONS.is_match(text) {
        return SeasonExpression::AllSeasons;
    }
    if REMAINING_SEASONS.is_match(text) {
        return SeasonExpression::RemainingSeasons;
    }
    if NEXT_SEASON.is_match(text) {
        return SeasonExpression::NextSeason;
    }
    if NEGATIVE_NUMBER.is_match(text) {
        return SeasonExpression::Invalid("season numbers must be positive".to_string());
    }

    match parse_numbers(text).and_then(|seasons| match seasons {
        Some(seasons) => Ok(Some(seasons)),
        None => loose_seasons(text),
    }) {
        Ok(Some(seasons)) => validated(seasons),
        Ok(None) => SeasonExpression::Invalid(UNPARSEABLE.to_string()),
        Err(reason) => SeasonExpression::Invalid(reason),
    }
}

/// Pick season numbers out of text surrounded by words we do not understand.
///
/// Ranges are expanded first; quality tags ("4k", "1080p") and episode
/// numbers are never read as seasons.
fn loose_seasons(text: &str) -> Result<Option<Vec<u32>>, String> {
    let text = EPISODE_CODE.replace_all(text, "season $1");
    let text = NOT_A_SEASON.replace_all(&text, " ");

    let mut seasons = Vec::new();
    let mut leftover = String::new();
    let mut last = 0;

    for caps in LOOSE_RANGE.captures_iter(&text) {
        let (Some(whole), Some(start), Some(end)) = (
            caps.get(0),
            number_token(&caps[1])?,
            number_token(&caps[2])?,
        ) else {
            continue;
        };
        if start > end {
            return Err(format!(
                "range start {} is greater than range end {}",
                start, end
            ));
        }
        seasons.extend(start..=end);
        leftover.push_str(&text[last..whole.start()]);
        leftover.push(' ');
        last = whole.end();
    }
    leftover.push_str(&text[last..]);

    for m in DIGITS.find_iter(&leftover) {
        seasons.push(parse_number(m.as_str())?);
    }

    if seasons.is_empty() {
        return Ok(None);
    }
    Ok(Some(seasons))
}

/// Parse comma/and separated chunks, each a range or a run of numbers.
///
/// Returns `Ok(None)` when some token is not a number at all, so the caller
/// can decide how to treat the leftover text.
fn parse_numbers(text: &str) -> Result<Option<Vec<u32>>, String> {
    let mut seasons = Vec::new();

    for chunk in LIST_SEPARATOR.split(text) {
        let words: Vec<&str> = chunk
            .split_whitespace()
            .filter(|word| !FILLER_WORDS.contains(word))
            .collect();
        if words.is_empty() {
            continue;
        }
        let chunk = words.join(" ");

        if let Some(caps) = RANGE.captures(&chunk) {
            let start = number_token(&caps[1])?;
            let end = number_token(&caps[2])?;
            if let (Some(start), Some(end)) = (start, end) {
                if start > end {
                    return Err(format!(
                        "range start {} is greater than range end {}",
                        start, end
                    ));
                }
                seasons.extend(start..=end);
                continue;
            }
        }

        for word in words {
            match number_token(word)? {
                Some(n) => seasons.push(n),
                None => return Ok(None),
            }
        }
    }

    if seasons.is_empty() {
        return Ok(None);
    }
    Ok(Some(seasons))
}

fn number_token(token: &str) -> Result<Option<u32>, String> {
    if let Some(caps) = NUMERIC_TOKEN.captures(token) {
        return parse_number(&caps[1]).map(Some);
    }
    Ok(WORD_NUMBERS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, n)| *n))
}

fn parse_number(digits: &str) -> Result<u32, String> {
    match digits.parse::<u32>() {
        Ok(n) if n <= MAX_SEASON_NUMBER => Ok(n),
        _ => Err(format!(
            "season number {} is too large (maximum {})",
            digits, MAX_SEASON_NUMBER
        )),
    }
}

fn validated(seasons: Vec<u32>) -> SeasonExpression {
    if seasons.contains(&0) {
        return SeasonExpression::Invalid("season numbers start at 1".to_string());
    }
    SeasonExpression::explicit(seasons)
}

/// Pull an embedded season phrase out of a title.
///
/// "season 2 of Show Name" and "Show Name season 2" both yield
/// `("Show Name", Explicit({2}))`. A title without a recognizable season
/// phrase comes back normalized with [`SeasonExpression::Unspecified`], so
/// running this on its own output changes nothing.
pub fn extract_season_from_title(text: &str) -> (String, SeasonExpression) {
    let mut title = normalize_title(text);
    let mut expression = SeasonExpression::Unspecified;

    while let Some((rest, found)) = split_season_phrase(&title) {
        debug!("Extracted '{}' from title, remaining title '{}'", found, rest);
        if expression == SeasonExpression::Unspecified {
            expression = found;
        }
        title = rest;
    }

    (title, expression)
}

fn split_season_phrase(title: &str) -> Option<(String, SeasonExpression)> {
    let (season, rest) = if let Some(caps) = LEADING_SEASON_PHRASE.captures(title) {
        (caps["season"].to_string(), caps["title"].to_string())
    } else if let Some(caps) = TRAILING_SEASON_PHRASE.captures(title) {
        (caps["season"].to_string(), caps["title"].to_string())
    } else {
        return None;
    };

    let rest = normalize_title(&rest);
    if rest.is_empty() || rest.len() >= title.len() {
        return None;
    }

    match parse(&season) {
        SeasonExpression::Invalid(_) | SeasonExpression::Unspecified => None,
        expression => Some((rest, expression)),
    }
}

/// Collapse whitespace and strip dangling punctuation and quotes.
fn normalize_title(title: &str) -> String {
    WHITESPACE
        .replace_all(title.trim(), " ")
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ',' | ':' | ';' | '-' | '–' | '—' | '"' | '\'')
        })
        .to_string()
}
