use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::convert::DEFAULT_NULL_SENTINEL;
use crate::error::KiraError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoSeriesAccession(String);

impl GeoSeriesAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeoSeriesAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GeoSeriesAccession {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !has_numeric_suffix(&normalized, "GSE") {
            return Err(KiraError::InvalidSeriesAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pmid(String);

impl Pmid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pmid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pmid {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(KiraError::InvalidPmid(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

fn has_numeric_suffix(value: &str, prefix: &str) -> bool {
    value
        .strip_prefix(prefix)
        .map(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleRecord {
    pub accession: String,
    pub series: String,
    pub title: String,
    pub source_name: String,
    pub organism: String,
    pub molecule: String,
    pub characteristics_age: String,
    pub description: String,
    pub treatment_protocol: String,
    pub growth_protocol: String,
    pub extract_protocol: String,
    pub cell_type: String,
    pub cell_line: String,
    pub sex: String,
    pub tissue: String,
    pub genotype: String,
    pub channel_count: u32,
    pub is_cell_culture: bool,
}

impl SampleRecord {
    pub fn field(&self, field: SampleField) -> &str {
        match field {
            SampleField::Title => &self.title,
            SampleField::SourceName => &self.source_name,
            SampleField::Description => &self.description,
            SampleField::TreatmentProtocol => &self.treatment_protocol,
            SampleField::GrowthProtocol => &self.growth_protocol,
            SampleField::ExtractProtocol => &self.extract_protocol,
        }
    }

    pub fn is_multichannel(&self) -> bool {
        self.channel_count > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleField {
    Title,
    SourceName,
    Description,
    TreatmentProtocol,
    GrowthProtocol,
    ExtractProtocol,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyRecord {
    pub accession: String,
    pub title: String,
    pub summary: String,
    pub overall_design: String,
    pub article_reference: Option<Pmid>,
}

impl StudyRecord {
    pub fn field(&self, field: StudyField) -> &str {
        match field {
            StudyField::Title => &self.title,
            StudyField::Summary => &self.summary,
            StudyField::OverallDesign => &self.overall_design,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyField {
    Title,
    Summary,
    OverallDesign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTier {
    Sample,
    Study,
    Text,
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTier::Sample => write!(f, "Sample"),
            SourceTier::Study => write!(f, "Study"),
            SourceTier::Text => write!(f, "Text"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ExtractionResult {
    #[serde(serialize_with = "serialize_or_null")]
    pub value: Option<f64>,
    #[serde(serialize_with = "serialize_or_null")]
    pub source: Option<SourceTier>,
    pub flagged: bool,
}

impl ExtractionResult {
    pub fn found(value: f64, source: SourceTier, flagged: bool) -> Self {
        Self {
            value: Some(value),
            source: Some(source),
            flagged,
        }
    }

    pub fn missing(source: Option<SourceTier>, flagged: bool) -> Self {
        Self {
            value: None,
            source,
            flagged,
        }
    }

    pub fn not_applicable() -> Self {
        Self::default()
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{value}")?,
            None => write!(f, "{DEFAULT_NULL_SENTINEL}")?,
        }
        match self.source {
            Some(source) => write!(f, " ({source})")?,
            None => write!(f, " ({DEFAULT_NULL_SENTINEL})")?,
        }
        if self.flagged {
            write!(f, " [wide range]")?;
        }
        Ok(())
    }
}

pub(crate) fn serialize_or_null<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(inner) => inner.serialize(serializer),
        None => serializer.serialize_str(DEFAULT_NULL_SENTINEL),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Female => write!(f, "female"),
            Sex::Male => write!(f, "male"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleMetadata {
    pub accession: String,
    pub series: String,
    pub organism: String,
    pub source: String,
    pub molecule: String,
    pub age: ExtractionResult,
    pub sex: Option<Sex>,
    pub expression: bool,
    pub cells: bool,
    pub wild_type: bool,
    pub knockout: bool,
    pub knockout_gene: Option<String>,
    pub treated_with_molecule: bool,
}
