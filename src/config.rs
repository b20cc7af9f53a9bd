use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::convert::{DEFAULT_NULL_SENTINEL, TimeConverter};
use crate::domain::{SampleField, StudyField};
use crate::error::KiraError;
use crate::section::{DEFAULT_POSSIBLE_SECTIONS, HeaderStyle, SectionKind};
use crate::units::{TimeUnit, parse_units};

pub const DEFAULT_CONFIG_FILE: &str = "kira-mx.json";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<Vec<String>>,
    #[serde(default)]
    pub null_sentinel: Option<String>,
    #[serde(default)]
    pub try_study: Option<bool>,
    #[serde(default)]
    pub try_text: Option<bool>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub flag_range: Option<bool>,
    #[serde(default)]
    pub check_cells: Option<bool>,
    #[serde(default)]
    pub sample_fields: Option<Vec<SampleField>>,
    #[serde(default)]
    pub study_fields: Option<Vec<StudyField>>,
    #[serde(default)]
    pub possible_sections: Option<Vec<String>>,
    #[serde(default)]
    pub header_styles: Option<Vec<String>>,
    #[serde(default)]
    pub pmc_preference: Option<bool>,
    #[serde(default)]
    pub keep_multichannel: Option<bool>,
    #[serde(default)]
    pub keep_cells: Option<bool>,
    #[serde(default)]
    pub organism: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    pub schema_version: u32,
    pub to: TimeUnit,
    pub from_units: Vec<TimeUnit>,
    pub null_sentinel: String,
    pub try_study: bool,
    pub try_text: bool,
    pub section: SectionKind,
    pub flag_range: bool,
    pub check_cells: bool,
    pub sample_fields: Vec<SampleField>,
    pub study_fields: Vec<StudyField>,
    pub possible_sections: Vec<String>,
    pub header_styles: Vec<HeaderStyle>,
    pub pmc_preference: bool,
    pub keep_multichannel: bool,
    pub keep_cells: bool,
    pub organism: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            to: TimeUnit::Week,
            from_units: TimeUnit::ALL.to_vec(),
            null_sentinel: DEFAULT_NULL_SENTINEL.to_string(),
            try_study: true,
            try_text: true,
            section: SectionKind::Methods,
            flag_range: true,
            check_cells: true,
            sample_fields: default_sample_fields(),
            study_fields: default_study_fields(),
            possible_sections: DEFAULT_POSSIBLE_SECTIONS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            header_styles: HeaderStyle::DEFAULT_ORDER.to_vec(),
            pmc_preference: true,
            keep_multichannel: false,
            keep_cells: true,
            organism: None,
        }
    }
}

impl ExtractionConfig {
    pub fn converter(&self) -> TimeConverter {
        TimeConverter::new(self.to, self.from_units.clone())
            .with_flag_range(self.flag_range)
            .with_null_sentinel(self.null_sentinel.clone())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ExtractionConfig, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(ExtractionConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ExtractionConfig, KiraError> {
        let defaults = ExtractionConfig::default();

        let to = match config.to {
            Some(value) => value.parse()?,
            None => defaults.to,
        };
        let from_units = match config.from {
            Some(values) => parse_units(&values)?,
            None => defaults.from_units,
        };
        let section = match config.section {
            Some(value) => value.parse()?,
            None => defaults.section,
        };
        let header_styles = match config.header_styles {
            Some(values) => values
                .iter()
                .map(|value| value.parse())
                .collect::<Result<Vec<HeaderStyle>, KiraError>>()?,
            None => defaults.header_styles,
        };
        let possible_sections = config
            .possible_sections
            .map(|names| names.iter().map(|name| name.trim().to_lowercase()).collect())
            .unwrap_or(defaults.possible_sections);

        Ok(ExtractionConfig {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            to,
            from_units,
            null_sentinel: config.null_sentinel.unwrap_or(defaults.null_sentinel),
            try_study: config.try_study.unwrap_or(defaults.try_study),
            try_text: config.try_text.unwrap_or(defaults.try_text),
            section,
            flag_range: config.flag_range.unwrap_or(defaults.flag_range),
            check_cells: config.check_cells.unwrap_or(defaults.check_cells),
            sample_fields: config.sample_fields.unwrap_or(defaults.sample_fields),
            study_fields: config.study_fields.unwrap_or(defaults.study_fields),
            possible_sections,
            header_styles,
            pmc_preference: config.pmc_preference.unwrap_or(defaults.pmc_preference),
            keep_multichannel: config.keep_multichannel.unwrap_or(defaults.keep_multichannel),
            keep_cells: config.keep_cells.unwrap_or(defaults.keep_cells),
            organism: config.organism.or(defaults.organism),
        })
    }
}

pub fn default_sample_fields() -> Vec<SampleField> {
    vec![
        SampleField::Description,
        SampleField::TreatmentProtocol,
        SampleField::GrowthProtocol,
    ]
}

pub fn default_study_fields() -> Vec<StudyField> {
    vec![StudyField::Summary, StudyField::OverallDesign]
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved, ExtractionConfig::default());
        assert_eq!(resolved.to, TimeUnit::Week);
        assert_eq!(resolved.section, SectionKind::Methods);
        assert!(resolved.try_study && resolved.try_text && resolved.check_cells);
    }

    #[test]
    fn invalid_section_is_rejected() {
        let config = Config {
            section: Some("appendix".to_string()),
            ..Config::default()
        };
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(KiraError::InvalidSection(_))
        );
    }
}
