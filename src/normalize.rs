//! Lexical normalization applied before any time-phrase matching.
//!
//! Number words are swapped for digits one word at a time, so compound
//! numbers are not composed: "twenty one" becomes "20 1". Hyphens that glue
//! words together ("ten-week-old", "7-week") become spaces while numeric
//! ranges ("7-8") and unit-to-number joins ("20wks-1.5yrs") keep theirs.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

const NUMBER_WORDS: &[(&str, &str)] = &[
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("ten", "10"),
    ("eleven", "11"),
    ("twelve", "12"),
    ("thirteen", "13"),
    ("fourteen", "14"),
    ("fifteen", "15"),
    ("sixteen", "16"),
    ("seventeen", "17"),
    ("eighteen", "18"),
    ("nineteen", "19"),
    ("twenty", "20"),
    ("thirty", "30"),
    ("forty", "40"),
    ("fifty", "50"),
    ("sixty", "60"),
    ("seventy", "70"),
    ("eighty", "80"),
    ("ninety", "90"),
    ("hundred", "100"),
    ("thousand", "1000"),
    ("million", "1000000"),
    ("billion", "1000000000"),
    ("point", "."),
];

static NUMBER_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = NUMBER_WORDS
        .iter()
        .map(|(word, _)| *word)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).expect("number word table is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn normalize(text: &str) -> NormalizedText {
    let lowered = text.to_lowercase();
    let spaced = split_word_hyphens(&lowered);
    let numbered = NUMBER_WORD_RE.replace_all(&spaced, |caps: &Captures<'_>| {
        number_word_value(&caps[0]).unwrap_or(&caps[0]).to_string()
    });
    let collapsed = numbered.split_whitespace().collect::<Vec<_>>().join(" ");
    NormalizedText(collapsed)
}

pub fn number_word_value(word: &str) -> Option<&'static str> {
    NUMBER_WORDS
        .iter()
        .find(|(candidate, _)| *candidate == word)
        .map(|(_, digits)| *digits)
}

/// A hyphen with a character on both sides becomes a space unless the next
/// character is a digit. Neighbours are read from the original text so
/// chains like "ten-week-old" split completely in one pass.
fn split_word_hyphens(text: &str) -> String {
    let chars = text.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(text.len());
    for (idx, ch) in chars.iter().enumerate() {
        if *ch == '-' && idx > 0 {
            if let Some(next) = chars.get(idx + 1) {
                if !next.is_ascii_digit() {
                    out.push(' ');
                    continue;
                }
            }
        }
        out.push(*ch);
    }
    out
}
