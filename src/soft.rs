use crate::classify;
use crate::domain::{Pmid, SampleRecord, StudyRecord};
use crate::error::KiraError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesFamily {
    pub study: StudyRecord,
    pub organisms: Vec<String>,
    pub samples: Vec<SampleRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    None,
    Series,
    Platform,
    Sample,
    Other,
}

pub fn parse_family(text: &str) -> Result<SeriesFamily, KiraError> {
    let mut family = SeriesFamily::default();
    let mut entity = Entity::None;
    let mut in_table = false;
    let mut seen_series = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if in_table {
            if line.starts_with("!sample_table_end") || line.starts_with("!platform_table_end") {
                in_table = false;
            }
            continue;
        }
        if line.starts_with("!sample_table_begin") || line.starts_with("!platform_table_begin") {
            in_table = true;
            continue;
        }

        if let Some(header) = line.strip_prefix('^') {
            let (kind, value) = split_attribute(header);
            entity = match kind.to_ascii_uppercase().as_str() {
                "SERIES" => {
                    seen_series = true;
                    family.study.accession = value.to_string();
                    Entity::Series
                }
                "PLATFORM" => Entity::Platform,
                "SAMPLE" => {
                    finish_sample(&mut family);
                    family.samples.push(SampleRecord {
                        accession: value.to_string(),
                        series: family.study.accession.clone(),
                        channel_count: 1,
                        ..SampleRecord::default()
                    });
                    Entity::Sample
                }
                _ => Entity::Other,
            };
            continue;
        }

        let Some(attribute) = line.strip_prefix('!') else {
            continue;
        };
        let (key, value) = split_attribute(attribute);
        match entity {
            Entity::Series => apply_series_attribute(&mut family, key, value),
            Entity::Sample => {
                let sample = family.samples.last_mut().ok_or_else(|| {
                    KiraError::SoftParse(format!("line {}: sample attribute outside ^SAMPLE", idx + 1))
                })?;
                apply_sample_attribute(sample, key, value, idx + 1)?;
            }
            Entity::None if key.starts_with("Sample_") || key.starts_with("Series_") => {
                return Err(KiraError::SoftParse(format!(
                    "line {}: attribute {key} before any entity header",
                    idx + 1
                )));
            }
            _ => {}
        }
    }

    if !seen_series {
        return Err(KiraError::SoftParse("missing ^SERIES header".to_string()));
    }
    finish_sample(&mut family);
    Ok(family)
}

fn split_attribute(line: &str) -> (&str, &str) {
    match line.split_once('=') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (line.trim(), ""),
    }
}

fn append(target: &mut String, value: &str) {
    if value.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(value);
}

fn apply_series_attribute(family: &mut SeriesFamily, key: &str, value: &str) {
    match key {
        "Series_title" => append(&mut family.study.title, value),
        "Series_summary" => append(&mut family.study.summary, value),
        "Series_overall_design" => append(&mut family.study.overall_design, value),
        "Series_pubmed_id" if family.study.article_reference.is_none() => {
            match value.parse::<Pmid>() {
                Ok(pmid) => family.study.article_reference = Some(pmid),
                Err(err) => tracing::warn!(%err, "ignoring series PubMed id"),
            }
        }
        "Series_sample_organism" | "Series_organism" => {
            if !value.is_empty() && !family.organisms.iter().any(|known| known == value) {
                family.organisms.push(value.to_string());
            }
        }
        _ => {}
    }
}

fn apply_sample_attribute(
    sample: &mut SampleRecord,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), KiraError> {
    match key {
        "Sample_title" => append(&mut sample.title, value),
        "Sample_source_name_ch1" => append(&mut sample.source_name, value),
        "Sample_organism_ch1" => append(&mut sample.organism, value),
        "Sample_molecule_ch1" => append(&mut sample.molecule, value),
        "Sample_description" => append(&mut sample.description, value),
        "Sample_treatment_protocol_ch1" => append(&mut sample.treatment_protocol, value),
        "Sample_growth_protocol_ch1" => append(&mut sample.growth_protocol, value),
        "Sample_extract_protocol_ch1" => append(&mut sample.extract_protocol, value),
        "Sample_characteristics_ch1" => apply_characteristic(sample, value),
        "Sample_channel_count" => {
            sample.channel_count = value.parse().map_err(|_| {
                KiraError::SoftParse(format!("line {line}: invalid channel count {value:?}"))
            })?;
        }
        _ => {}
    }
    Ok(())
}

fn apply_characteristic(sample: &mut SampleRecord, raw: &str) {
    let Some((tag, value)) = raw.split_once(':') else {
        return;
    };
    let tag = tag.trim().to_lowercase();
    let value = value.trim();
    match tag.as_str() {
        "age" => append(&mut sample.characteristics_age, value),
        "sex" | "gender" => append(&mut sample.sex, value),
        "cell type" => append(&mut sample.cell_type, value),
        "cell line" => append(&mut sample.cell_line, value),
        "tissue" => append(&mut sample.tissue, value),
        "genotype" | "genotype/variation" | "strain" => append(&mut sample.genotype, value),
        other => {
            if let Some(unit) = other
                .strip_prefix("age")
                .map(str::trim)
                .and_then(|rest| rest.strip_prefix('('))
                .and_then(|rest| rest.strip_suffix(')'))
            {
                append(&mut sample.characteristics_age, &format!("{value} {unit}"));
            }
        }
    }
}

fn finish_sample(family: &mut SeriesFamily) {
    if let Some(sample) = family.samples.last_mut() {
        sample.is_cell_culture = classify::is_cell_culture(
            &sample.treatment_protocol,
            &sample.growth_protocol,
            &sample.cell_line,
            &sample.cell_type,
        );
    }
}
