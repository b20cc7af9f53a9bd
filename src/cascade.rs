use crate::config::ExtractionConfig;
use crate::convert::{Conversion, TimeConverter};
use crate::domain::{ExtractionResult, SampleRecord, SourceTier, StudyRecord};
use crate::pubmed::{self, ArticleClient};
use crate::section;

pub struct AgeExtractor<'a, A: ArticleClient + ?Sized> {
    config: &'a ExtractionConfig,
    converter: TimeConverter,
    articles: &'a A,
}

impl<'a, A: ArticleClient + ?Sized> AgeExtractor<'a, A> {
    pub fn new(config: &'a ExtractionConfig, articles: &'a A) -> Self {
        Self {
            config,
            converter: config.converter(),
            articles,
        }
    }

    /// Runs the cascade for one sample. `study` is the sample's parent
    /// series, when known.
    ///
    /// Each tier ends the cascade when it yields a value. When nothing is
    /// found the result names the last tier that ran, and keeps any flag
    /// raised on the way unless the article tier reports its own.
    pub fn extract(&self, sample: &SampleRecord, study: Option<&StudyRecord>) -> ExtractionResult {
        if sample.is_cell_culture && self.config.check_cells {
            tracing::debug!(sample = %sample.accession, "cell culture sample, age not applicable");
            return ExtractionResult::not_applicable();
        }

        let from_sample = self.sample_tier(sample);
        if let Some(value) = from_sample.value {
            return ExtractionResult::found(value, SourceTier::Sample, from_sample.flagged);
        }
        if !self.config.try_study {
            return ExtractionResult::missing(Some(SourceTier::Sample), from_sample.flagged);
        }

        let from_study = self.study_tier(study);
        if let Some(value) = from_study.value {
            return ExtractionResult::found(value, SourceTier::Study, from_study.flagged);
        }
        let kept_flag = from_sample.flagged || from_study.flagged;
        if !self.config.try_text {
            return ExtractionResult::missing(Some(SourceTier::Study), kept_flag);
        }

        let from_text = self.text_tier(study);
        match from_text.value {
            Some(value) => ExtractionResult::found(value, SourceTier::Text, from_text.flagged),
            None => ExtractionResult::missing(Some(SourceTier::Text), kept_flag || from_text.flagged),
        }
    }

    /// The characteristics age and the other configured fields are converted
    /// separately. A characteristics age that repeats one of the field ages
    /// is counted once.
    pub fn sample_tier(&self, sample: &SampleRecord) -> Conversion {
        let characteristics = if sample.characteristics_age.trim().is_empty() {
            Conversion::none()
        } else {
            self.converter.convert(&sample.characteristics_age)
        };

        let mut flagged = characteristics.flagged;
        let mut others = Vec::new();
        for field in &self.config.sample_fields {
            let found = self.converter.convert(sample.field(*field));
            flagged |= found.flagged;
            if let Some(value) = found.value {
                others.push(value);
            }
        }
        let others_sum = others.iter().sum::<f64>();

        let value = match characteristics.value {
            Some(age) if others.contains(&age) => Some(others_sum),
            Some(age) if !others.is_empty() => Some(age + others_sum),
            Some(age) => Some(age),
            None if !others.is_empty() => Some(others_sum),
            None => None,
        };
        tracing::debug!(sample = %sample.accession, ?value, flagged, "sample tier");
        Conversion { value, flagged }
    }

    pub fn study_tier(&self, study: Option<&StudyRecord>) -> Conversion {
        let Some(study) = study else {
            tracing::debug!("no parent study record");
            return Conversion::none();
        };
        let mut total = None;
        let mut flagged = false;
        for field in &self.config.study_fields {
            let found = self.converter.convert(study.field(*field));
            flagged |= found.flagged;
            if let Some(value) = found.value {
                total = Some(total.unwrap_or(0.0) + value);
            }
        }
        tracing::debug!(study = %study.accession, value = ?total, flagged, "study tier");
        Conversion {
            value: total,
            flagged,
        }
    }

    pub fn text_tier(&self, study: Option<&StudyRecord>) -> Conversion {
        let Some(pmid) = study.and_then(|study| study.article_reference.as_ref()) else {
            tracing::info!("study cites no article, skipping full-text tier");
            return Conversion::none();
        };

        let page = match self.articles.fetch_pubmed_page(pmid) {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(%pmid, %err, "PubMed page unavailable");
                return Conversion::none();
            }
        };
        let links = pubmed::prefer_pmc(pubmed::full_text_links(&page), self.config.pmc_preference);
        if links.is_empty() {
            tracing::info!(%pmid, "no full-text links on PubMed page");
            return Conversion::none();
        }

        let Some(best) = section::select_best_source(
            &links,
            &self.config.possible_sections,
            &self.config.header_styles,
            |link| self.articles.fetch_url(link),
        ) else {
            return Conversion::none();
        };
        let Some(text) = section::extract_section(&best.text, self.config.section, best.style) else {
            tracing::info!(%pmid, link = %best.link, section = %self.config.section, "section not found");
            return Conversion::none();
        };
        self.converter.convert(&text)
    }
}
