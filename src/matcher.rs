//! Finds time quantities in normalized text and splits them into organism
//! ages and exposure durations.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::normalize::NormalizedText;
use crate::units::TimeUnit;

const NUMBER: &str = r"[0-9]+(?:\.[0-9]+)?";

struct UnitMatcher {
    quantity: Regex,
    continuation: Regex,
}

static UNIT_MATCHERS: LazyLock<HashMap<TimeUnit, UnitMatcher>> = LazyLock::new(|| {
    TimeUnit::ALL
        .into_iter()
        .map(|unit| (unit, build_unit_matcher(unit)))
        .collect()
});

/// The optional `marker` group captures a preceding duration word; `value`
/// is either a single number or a hyphenated range, and the optional range
/// tail means a range is always preferred over its first endpoint. What may
/// follow the unit is checked in [`is_terminated`].
fn build_unit_matcher(unit: TimeUnit) -> UnitMatcher {
    let patterns = unit.patterns();
    let quantity = format!(
        r"(?:\b(?P<marker>for|after)\s+)?(?P<value>{NUMBER}(?:-{NUMBER})?)[ \-]?(?:(?P<long>{long})|(?P<abbrev>{abbrev}))s?",
        long = patterns.long,
        abbrev = patterns.abbrev,
    );
    let continuation = format!(
        r"^{NUMBER}[ \-]?(?:{long}|{abbrev})",
        long = patterns.long,
        abbrev = patterns.abbrev,
    );
    UnitMatcher {
        quantity: Regex::new(&quantity).expect("unit pattern is a valid regex"),
        continuation: Regex::new(&continuation).expect("continuation pattern is a valid regex"),
    }
}

/// A unit may not run into a letter or digit ("15 mosquitoes"). An
/// abbreviation may be glued to a hyphen ("20wks-1.5yrs"); a spelled unit
/// only when the hyphen leads to another quantity of the same unit
/// ("7week-8week", but not "4day-10mos").
fn is_terminated(rest: &str, abbreviated: bool, continuation: &Regex) -> bool {
    match rest.chars().next() {
        None => true,
        Some('-') => abbreviated || continuation.is_match(&rest[1..]),
        Some(ch) => !ch.is_alphanumeric(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub ages: Vec<f64>,
    pub durations: Vec<f64>,
}

impl Candidates {
    pub fn is_empty(&self) -> bool {
        self.ages.is_empty() && self.durations.is_empty()
    }

    pub fn extend(&mut self, other: Candidates) {
        self.ages.extend(other.ages);
        self.durations.extend(other.durations);
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenError {
    #[error("unparseable number {0:?}")]
    Unparseable(String),
    #[error("number {0:?} is not finite")]
    NonFinite(String),
}

#[derive(Debug, Clone, PartialEq)]
struct TimeToken {
    endpoints: Vec<f64>,
    duration: bool,
}

/// Scans `text` for quantities written in `from` units and returns them in
/// `to` units.
///
/// A quantity directly preceded by "for" or "after" is a duration, anything
/// else an age. Ranges collapse to the mean of their endpoints. An age
/// endpoint equal to a raw duration value seen in this pass is treated as a
/// restatement of that duration and dropped.
pub fn extract_candidates(text: &NormalizedText, from: TimeUnit, to: TimeUnit) -> Candidates {
    let coef = from.coefficient(to);
    let tokens = scan_tokens(text.as_str(), from);

    let claimed = tokens
        .iter()
        .filter(|token| token.duration)
        .flat_map(|token| token.endpoints.iter().copied())
        .collect::<Vec<_>>();

    let mut candidates = Candidates::default();
    for token in tokens {
        if token.duration {
            candidates.durations.push(mean(&token.endpoints) * coef);
            continue;
        }
        let kept = token
            .endpoints
            .iter()
            .copied()
            .filter(|value| !claimed.contains(value))
            .collect::<Vec<_>>();
        if kept.is_empty() {
            tracing::trace!(?token, "age restates a duration, skipped");
            continue;
        }
        candidates.ages.push(mean(&kept) * coef);
    }
    candidates
}

fn scan_tokens(text: &str, unit: TimeUnit) -> Vec<TimeToken> {
    let matcher = &UNIT_MATCHERS[&unit];
    let mut tokens = Vec::new();
    for caps in matcher.quantity.captures_iter(text) {
        let (Some(whole), Some(value)) = (caps.get(0), caps.name("value")) else {
            continue;
        };
        let abbreviated = caps.name("abbrev").is_some();
        if !is_terminated(&text[whole.end()..], abbreviated, &matcher.continuation) {
            continue;
        }
        match parse_endpoints(value.as_str()) {
            Ok(endpoints) => tokens.push(TimeToken {
                endpoints,
                duration: caps.name("marker").is_some(),
            }),
            Err(err) => {
                tracing::trace!(%err, unit = %unit, "skipping malformed time token");
            }
        }
    }
    tokens
}

fn parse_endpoints(raw: &str) -> Result<Vec<f64>, TokenError> {
    raw.split('-').map(parse_number).collect()
}

pub(crate) fn parse_number(raw: &str) -> Result<f64, TokenError> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| TokenError::Unparseable(raw.to_string()))?;
    if !value.is_finite() {
        return Err(TokenError::NonFinite(raw.to_string()));
    }
    Ok(value)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::normalize::normalize;

    fn candidates(text: &str, from: TimeUnit, to: TimeUnit) -> Candidates {
        extract_candidates(&normalize(text), from, to)
    }

    #[test]
    fn bare_age() {
        let found = candidates("10 weeks old", TimeUnit::Week, TimeUnit::Week);
        assert_eq!(found.ages, vec![10.0]);
        assert!(found.durations.is_empty());
    }

    #[test]
    fn duration_after_marker() {
        let found = candidates("10 weeks for 5 weeks", TimeUnit::Week, TimeUnit::Week);
        assert_eq!(found.ages, vec![10.0]);
        assert_eq!(found.durations, vec![5.0]);

        let found = candidates("harvested after 3 days", TimeUnit::Day, TimeUnit::Day);
        assert!(found.ages.is_empty());
        assert_eq!(found.durations, vec![3.0]);
    }

    #[test]
    fn range_is_averaged_once() {
        let found = candidates("6-10 weeks for 7 days", TimeUnit::Week, TimeUnit::Week);
        assert_eq!(found.ages, vec![8.0]);
        assert!(found.durations.is_empty());

        let found = candidates("6-10 weeks for 7 days", TimeUnit::Day, TimeUnit::Week);
        assert!(found.ages.is_empty());
        assert_eq!(found.durations.len(), 1);
        assert!((found.durations[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn day_range_with_day_duration() {
        let found = candidates("6-8 days for 7 days", TimeUnit::Day, TimeUnit::Day);
        assert_eq!(found.ages, vec![7.0]);
        assert_eq!(found.durations, vec![7.0]);
    }

    #[test]
    fn age_restating_duration_is_dropped() {
        let found = candidates("7 weeks old, fed for 7 weeks", TimeUnit::Week, TimeUnit::Week);
        assert!(found.ages.is_empty());
        assert_eq!(found.durations, vec![7.0]);
    }

    #[test]
    fn abbreviations_and_trailing_forms() {
        let found = candidates("20wks-1.5yrs", TimeUnit::Week, TimeUnit::Week);
        assert_eq!(found.ages, vec![20.0]);
        let found = candidates("20wks-1.5yrs", TimeUnit::Year, TimeUnit::Week);
        assert_eq!(found.ages, vec![78.0]);
        let found = candidates("7-8wk", TimeUnit::Week, TimeUnit::Week);
        assert_eq!(found.ages, vec![7.5]);
        let found = candidates("4d-10days", TimeUnit::Day, TimeUnit::Day);
        assert_eq!(found.ages, vec![4.0, 10.0]);
    }

    #[test]
    fn spelled_unit_glued_to_hyphen_needs_same_unit() {
        let found = candidates("4day-10mos", TimeUnit::Day, TimeUnit::Day);
        assert!(found.is_empty());
        let found = candidates("4day-10mos", TimeUnit::Month, TimeUnit::Week);
        assert_eq!(found.ages, vec![40.0]);
        let found = candidates("7week-8week", TimeUnit::Week, TimeUnit::Week);
        assert_eq!(found.ages, vec![7.0, 8.0]);
        let found = candidates("1year-2 yrs", TimeUnit::Year, TimeUnit::Year);
        assert_eq!(found.ages, vec![1.0, 2.0]);
    }

    #[test]
    fn unknown_units_yield_nothing() {
        for unit in TimeUnit::ALL {
            assert!(candidates("6-10 eons for 7 iotas", unit, TimeUnit::Week).is_empty());
        }
    }

    #[test]
    fn words_ending_in_unit_letters_are_ignored() {
        let found = candidates("12 doses of 3 mg", TimeUnit::Day, TimeUnit::Day);
        assert!(found.is_empty());
        for (text, unit) in [
            ("15 mosquitoes per cage", TimeUnit::Month),
            ("3 mostly male", TimeUnit::Month),
            ("2 dsRNA injections", TimeUnit::Day),
            ("5 yrsomething", TimeUnit::Year),
            ("4 weeksx", TimeUnit::Week),
        ] {
            assert!(candidates(text, unit, TimeUnit::Week).is_empty(), "{text}");
        }
        let found = candidates("fed 10 weeks/day (8 wk)", TimeUnit::Week, TimeUnit::Week);
        assert_eq!(found.ages, vec![10.0, 8.0]);
    }

    #[test]
    fn malformed_tokens_are_typed() {
        assert_matches!(parse_number("1e999"), Err(TokenError::NonFinite(_)));
        assert_matches!(parse_number(""), Err(TokenError::Unparseable(_)));
        assert_eq!(parse_number("6.5"), Ok(6.5));
    }
}
