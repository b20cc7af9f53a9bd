use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::cascade::AgeExtractor;
use crate::classify;
use crate::config::ExtractionConfig;
use crate::convert::TimeConverter;
use crate::domain::{
    GeoSeriesAccession, Pmid, SampleMetadata, SampleRecord, StudyRecord, serialize_or_null,
};
use crate::error::KiraError;
use crate::geo::GeoClient;
use crate::pubmed::ArticleClient;
use crate::soft::{SeriesFamily, parse_family};
use crate::store::Store;
use crate::units::TimeUnit;

#[derive(Debug, Clone, Default)]
pub struct SeriesOptions {
    pub no_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesResult {
    pub series: String,
    pub title: String,
    pub article_reference: Option<Pmid>,
    pub source: String,
    pub samples: Vec<SampleMetadata>,
    pub skipped: Vec<SkippedSample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSample {
    pub accession: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Multichannel,
    CellCulture,
    Organism,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertResult {
    pub text: String,
    pub to: TimeUnit,
    pub from: Vec<TimeUnit>,
    #[serde(serialize_with = "serialize_or_null")]
    pub value: Option<f64>,
    pub flagged: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<G: GeoClient, A: ArticleClient> {
    store: Store,
    geo: G,
    articles: A,
}

impl<G: GeoClient, A: ArticleClient> App<G, A> {
    pub fn new(store: Store, geo: G, articles: A) -> Self {
        Self {
            store,
            geo,
            articles,
        }
    }

    pub fn series(
        &self,
        accession: &GeoSeriesAccession,
        config: &ExtractionConfig,
        options: &SeriesOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SeriesResult, KiraError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; series {accession}"),
            elapsed: None,
        });

        let (soft_text, source) = self.family_soft(accession, options)?;
        let family = parse_family(&soft_text)?;
        if family.samples.is_empty() {
            return Err(KiraError::EmptySeries(accession.to_string()));
        }
        sink.event(ProgressEvent {
            message: format!(
                "phase=Parse; {} samples from {source}",
                family.samples.len()
            ),
            elapsed: Some(started.elapsed()),
        });

        let articles = CachedArticles {
            store: &self.store,
            inner: &self.articles,
            no_cache: options.no_cache,
        };
        let extractor = AgeExtractor::new(config, &articles);
        let SeriesFamily { study, samples, .. } = family;

        let mut extracted = Vec::new();
        let mut skipped = Vec::new();
        for sample in &samples {
            if let Some(reason) = skip_reason(sample, config) {
                tracing::info!(sample = %sample.accession, ?reason, "skipping sample");
                skipped.push(SkippedSample {
                    accession: sample.accession.clone(),
                    reason,
                });
                continue;
            }
            extracted.push(sample_metadata(sample, &study, &extractor));
        }

        sink.event(ProgressEvent {
            message: format!(
                "phase=Extract; {} extracted, {} skipped",
                extracted.len(),
                skipped.len()
            ),
            elapsed: Some(started.elapsed()),
        });

        Ok(SeriesResult {
            series: accession.to_string(),
            title: study.title.clone(),
            article_reference: study.article_reference.clone(),
            source: source.to_string(),
            samples: extracted,
            skipped,
        })
    }

    fn family_soft(
        &self,
        accession: &GeoSeriesAccession,
        options: &SeriesOptions,
    ) -> Result<(String, &'static str), KiraError> {
        let path = self.store.soft_path(accession);
        if !options.no_cache {
            if let Some(text) = Store::read_text(&path)? {
                return Ok((text, "cache"));
            }
        }
        let text = self.geo.fetch_family_soft(accession)?;
        self.store
            .cache_text(&path, "soft", accession.as_str(), "geo", &text)?;
        Ok((text, "geo"))
    }
}

pub fn convert_text(text: &str, converter: &TimeConverter) -> ConvertResult {
    let conversion = converter.convert(text);
    ConvertResult {
        text: text.to_string(),
        to: converter.to(),
        from: converter.from_units().to_vec(),
        value: conversion.value,
        flagged: conversion.flagged,
    }
}

fn skip_reason(sample: &SampleRecord, config: &ExtractionConfig) -> Option<SkipReason> {
    if sample.is_multichannel() && !config.keep_multichannel {
        return Some(SkipReason::Multichannel);
    }
    if sample.is_cell_culture && !config.keep_cells {
        return Some(SkipReason::CellCulture);
    }
    if let Some(organism) = &config.organism {
        if !sample.organism.eq_ignore_ascii_case(organism.trim()) {
            return Some(SkipReason::Organism);
        }
    }
    None
}

fn sample_metadata<A: ArticleClient + ?Sized>(
    sample: &SampleRecord,
    study: &StudyRecord,
    extractor: &AgeExtractor<'_, A>,
) -> SampleMetadata {
    let knockout = classify::is_knockout(sample);
    SampleMetadata {
        accession: sample.accession.clone(),
        series: sample.series.clone(),
        organism: sample.organism.clone(),
        source: sample.source_name.clone(),
        molecule: sample.molecule.clone(),
        age: extractor.extract(sample, Some(study)),
        sex: classify::sex(sample),
        expression: classify::is_expression(sample),
        cells: sample.is_cell_culture,
        wild_type: classify::is_wild_type(sample),
        knockout,
        knockout_gene: if knockout {
            classify::knockout_gene(sample)
        } else {
            None
        },
        treated_with_molecule: classify::is_treated_with_molecule(sample),
    }
}

struct CachedArticles<'a, A: ArticleClient> {
    store: &'a Store,
    inner: &'a A,
    no_cache: bool,
}

impl<A: ArticleClient> CachedArticles<'_, A> {
    fn cached<F>(
        &self,
        path: Utf8PathBuf,
        kind: &str,
        id: &str,
        source: &str,
        fetch: F,
    ) -> Result<String, KiraError>
    where
        F: FnOnce() -> Result<String, KiraError>,
    {
        if !self.no_cache {
            if let Some(text) = Store::read_text(&path)? {
                return Ok(text);
            }
        }
        let text = fetch()?;
        if let Err(err) = self.store.cache_text(&path, kind, id, source, &text) {
            tracing::warn!(%err, %path, "could not cache article page");
        }
        Ok(text)
    }
}

impl<A: ArticleClient> ArticleClient for CachedArticles<'_, A> {
    fn fetch_pubmed_page(&self, pmid: &Pmid) -> Result<String, KiraError> {
        self.cached(
            self.store.pubmed_path(pmid),
            "pubmed",
            pmid.as_str(),
            "pubmed",
            || self.inner.fetch_pubmed_page(pmid),
        )
    }

    fn fetch_url(&self, url: &str) -> Result<String, KiraError> {
        self.cached(self.store.article_path(url), "article", url, "article", || {
            self.inner.fetch_url(url)
        })
    }
}
