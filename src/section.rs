use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

pub const DEFAULT_POSSIBLE_SECTIONS: &[&str] = &[
    "abstract",
    "introduction",
    "figures",
    "materials and methods",
    "methods",
    "experimental procedures",
    "results",
    "discussion",
    "method summary",
    "supplementary material",
    "acknowledgements",
    "references",
    "conclusions",
    "supporting information",
    "funding",
];

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(?P<label>.*?)</h1\s*>").expect("valid h1 regex"));
static H2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2\b[^>]*>(?P<label>.*?)</h2\s*>").expect("valid h2 regex"));
static H6_DIV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*\bclass\s*=\s*["'](?:[^"']*\s)?h6(?:\s[^"']*)?["'][^>]*>(?P<label>.*?)</div\s*>"#)
        .expect("valid h6 div regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderStyle {
    #[serde(rename = "h2")]
    H2,
    #[serde(rename = "h1")]
    H1,
    #[serde(rename = "h6")]
    H6Div,
}

impl HeaderStyle {
    pub const DEFAULT_ORDER: [HeaderStyle; 3] = [HeaderStyle::H2, HeaderStyle::H1, HeaderStyle::H6Div];

    fn regex(&self) -> &'static Regex {
        match self {
            HeaderStyle::H1 => &H1_RE,
            HeaderStyle::H2 => &H2_RE,
            HeaderStyle::H6Div => &H6_DIV_RE,
        }
    }
}

impl fmt::Display for HeaderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderStyle::H2 => write!(f, "h2"),
            HeaderStyle::H1 => write!(f, "h1"),
            HeaderStyle::H6Div => write!(f, "h6"),
        }
    }
}

impl FromStr for HeaderStyle {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "h2" => Ok(HeaderStyle::H2),
            "h1" => Ok(HeaderStyle::H1),
            "h6" => Ok(HeaderStyle::H6Div),
            _ => Err(KiraError::InvalidHeaderStyle(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SectionKind {
    Abstract,
    Introduction,
    Methods,
    Results,
    Conclusions,
}

impl SectionKind {
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            SectionKind::Abstract => &["abstract"],
            SectionKind::Introduction => &["intro", "introduction"],
            SectionKind::Methods => &["methods", "procedures"],
            SectionKind::Results => &["results"],
            SectionKind::Conclusions => &["discussion", "conclusions"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Abstract => "abstract",
            SectionKind::Introduction => "introduction",
            SectionKind::Methods => "methods",
            SectionKind::Results => "results",
            SectionKind::Conclusions => "conclusions",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_lowercase();
        [
            SectionKind::Abstract,
            SectionKind::Introduction,
            SectionKind::Methods,
            SectionKind::Results,
            SectionKind::Conclusions,
        ]
        .into_iter()
        .find(|kind| kind.synonyms().contains(&lowered.as_str()))
        .ok_or_else(|| KiraError::InvalidSection(value.to_string()))
    }
}

impl TryFrom<String> for SectionKind {
    type Error = KiraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SectionKind> for String {
    fn from(value: SectionKind) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestSource {
    pub link: String,
    pub text: String,
    pub style: HeaderStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    start: usize,
    end: usize,
    label: String,
}

fn headers(text: &str, style: HeaderStyle) -> Vec<Header> {
    style
        .regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.name("label")?;
            Some(Header {
                start: whole.start(),
                end: whole.end(),
                label: visible_text(label.as_str()).to_lowercase(),
            })
        })
        .collect()
}

fn visible_text(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn count_sections<S: AsRef<str>>(text: &str, possible_sections: &[S], style: HeaderStyle) -> usize {
    headers(text, style)
        .iter()
        .map(|header| {
            possible_sections
                .iter()
                .filter(|name| header.label == name.as_ref())
                .count()
        })
        .sum()
}

pub fn select_best_source<S, F>(
    links: &[String],
    possible_sections: &[S],
    styles: &[HeaderStyle],
    mut fetch: F,
) -> Option<BestSource>
where
    S: AsRef<str>,
    F: FnMut(&str) -> Result<String, KiraError>,
{
    let mut best: Option<(usize, BestSource)> = None;
    for link in links {
        let text = match fetch(link) {
            Ok(text) => text.to_lowercase(),
            Err(err) => {
                tracing::warn!(%link, %err, "skipping full-text link");
                continue;
            }
        };
        for style in styles {
            let count = count_sections(&text, possible_sections, *style);
            tracing::debug!(%link, %style, count, "section headings");
            let better = best.as_ref().map(|(max, _)| count > *max).unwrap_or(count > 0);
            if better {
                best = Some((
                    count,
                    BestSource {
                        link: link.clone(),
                        text: text.clone(),
                        style: *style,
                    },
                ));
            }
        }
    }
    if best.is_none() {
        tracing::info!("no recognizable section headings in any full-text link");
    }
    best.map(|(_, source)| source)
}

pub fn extract_section(text: &str, section: SectionKind, style: HeaderStyle) -> Option<String> {
    let found = headers(text, style);
    let position = found.iter().position(|header| {
        section
            .synonyms()
            .iter()
            .any(|synonym| header.label.contains(synonym))
    })?;
    let Some(next) = found.get(position + 1) else {
        tracing::debug!(%section, "section is the last heading, no closing boundary");
        return None;
    };
    let body = &text[found[position].end..next.start];
    let single_line = if body.contains('\n') {
        body.replace(['\r', '\n'], "")
    } else {
        body.to_string()
    };
    let cleaned = visible_text(&single_line);
    (!cleaned.is_empty()).then_some(cleaned)
}
