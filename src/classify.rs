use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{SampleRecord, Sex};

pub const CELL_CULTURE_KEYWORDS: &[&str] = &["DMEM", "FBS", "bovine serum", "passage"];

static FEMALE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfemales?\b").expect("valid female regex"));
static MALE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmales?\b").expect("valid male regex"));
static WILD_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])(?:wild|w)[ \-_]?(?:type|t)(?:$|[^a-z0-9])")
        .expect("valid wild type regex")
});
static KNOCKOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(?:^|[^a-z0-9])k[ \-_]?o(?:$|[^a-z0-9])|knock[ \-_]?out)")
        .expect("valid knockout regex")
});
static KNOCKOUT_GENE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<gene>[a-z0-9]+)[ \-_]?(?:ko(?:$|[^a-z0-9])|knock[ \-_]?out)")
        .expect("valid gene regex")
});
static MOLECULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:treatment[a-z\s]*with|treated[a-z\s]with)").expect("valid molecule regex")
});

pub fn is_cell_culture(
    treatment_protocol: &str,
    growth_protocol: &str,
    cell_line: &str,
    cell_type: &str,
) -> bool {
    let protocol_hit = [treatment_protocol, growth_protocol].iter().any(|protocol| {
        CELL_CULTURE_KEYWORDS
            .iter()
            .any(|keyword| protocol.contains(keyword))
    });
    protocol_hit || !cell_line.trim().is_empty() || !cell_type.trim().is_empty()
}

pub fn sex(sample: &SampleRecord) -> Option<Sex> {
    [
        sample.sex.as_str(),
        sample.treatment_protocol.as_str(),
        sample.growth_protocol.as_str(),
    ]
    .into_iter()
    .find_map(sex_in)
}

fn sex_in(text: &str) -> Option<Sex> {
    if FEMALE_RE.is_match(text) {
        Some(Sex::Female)
    } else if MALE_RE.is_match(text) {
        Some(Sex::Male)
    } else {
        None
    }
}

pub fn is_wild_type(sample: &SampleRecord) -> bool {
    [&sample.title, &sample.source_name, &sample.genotype, &sample.description]
        .iter()
        .any(|text| WILD_TYPE_RE.is_match(text))
}

pub fn is_knockout(sample: &SampleRecord) -> bool {
    [&sample.title, &sample.source_name, &sample.genotype]
        .iter()
        .any(|text| KNOCKOUT_RE.is_match(text))
}

pub fn knockout_gene(sample: &SampleRecord) -> Option<String> {
    [&sample.genotype, &sample.title, &sample.source_name]
        .iter()
        .find_map(|text| KNOCKOUT_GENE_RE.captures(text))
        .and_then(|caps| caps.name("gene"))
        .map(|gene| gene.as_str().to_string())
}

pub fn is_treated_with_molecule(sample: &SampleRecord) -> bool {
    [&sample.title, &sample.source_name, &sample.treatment_protocol]
        .iter()
        .any(|text| MOLECULE_RE.is_match(text))
}

pub fn is_expression(sample: &SampleRecord) -> bool {
    sample.molecule.contains("RNA") || sample.source_name.contains("RNA")
}
