use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;

use camino::Utf8PathBuf;

use kira_metadata_extract::app::{App, SeriesOptions, SkipReason};
use kira_metadata_extract::config::ExtractionConfig;
use kira_metadata_extract::domain::{GeoSeriesAccession, Pmid, Sex, SourceTier};
use kira_metadata_extract::error::KiraError;
use kira_metadata_extract::geo::GeoClient;
use kira_metadata_extract::output::JsonOutput;
use kira_metadata_extract::pubmed::ArticleClient;
use kira_metadata_extract::store::Store;

const FAMILY: &str = "\
^SERIES = GSE1000
!Series_title = Aging liver
!Series_summary = Livers from aged mice.
!Series_overall_design = Mice were sacrificed at 20 weeks of age.
!Series_pubmed_id = 25123456
!Series_sample_organism = Mus musculus
^SAMPLE = GSM1
!Sample_title = liver_WT_rep1
!Sample_channel_count = 1
!Sample_organism_ch1 = Mus musculus
!Sample_characteristics_ch1 = age: 10 weeks
!Sample_characteristics_ch1 = Sex: female
!Sample_treatment_protocol_ch1 = Fed for 2 weeks.
^SAMPLE = GSM2
!Sample_title = two colour array
!Sample_channel_count = 2
!Sample_organism_ch1 = Mus musculus
^SAMPLE = GSM3
!Sample_title = liver_KO_rep1
!Sample_channel_count = 1
!Sample_organism_ch1 = Mus musculus
!Sample_characteristics_ch1 = genotype: Ppara KO
^SAMPLE = GSM4
!Sample_title = primary hepatocytes
!Sample_channel_count = 1
!Sample_organism_ch1 = Mus musculus
!Sample_characteristics_ch1 = cell type: hepatocyte
";

const NO_AGE_FAMILY: &str = "\
^SERIES = GSE2000
!Series_title = Kidney atlas
!Series_summary = Kidneys were profiled.
!Series_pubmed_id = 31000000
^SAMPLE = GSM10
!Sample_title = kidney rep1
!Sample_channel_count = 1
!Sample_organism_ch1 = Mus musculus
";

const PUBMED_PAGE: &str = r#"<aside><h3>Full text links</h3><ul>
<li><a href="https://www.ncbi.nlm.nih.gov/pmc/articles/PMC42/">PMC</a></li>
</ul></aside>"#;

const ARTICLE: &str = "<h2>Abstract</h2><p>We looked.</p>\
<h2>Methods</h2><p>Mice were 8 weeks old.</p>\
<h2>Results</h2><p>Done.</p>";

struct MockGeo {
    soft: &'static str,
    calls: Mutex<usize>,
}

impl MockGeo {
    fn new(soft: &'static str) -> Self {
        Self {
            soft,
            calls: Mutex::new(0),
        }
    }
}

impl GeoClient for MockGeo {
    fn fetch_family_soft(&self, _accession: &GeoSeriesAccession) -> Result<String, KiraError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.soft.to_string())
    }
}

#[derive(Default, Clone)]
struct MockArticles {
    pubmed_calls: Arc<Mutex<usize>>,
    url_calls: Arc<Mutex<usize>>,
}

impl ArticleClient for MockArticles {
    fn fetch_pubmed_page(&self, pmid: &Pmid) -> Result<String, KiraError> {
        *self.pubmed_calls.lock().unwrap() += 1;
        match pmid.as_str() {
            "31000000" => Ok(PUBMED_PAGE.to_string()),
            _ => Err(KiraError::ArticleHttp("not implemented".to_string())),
        }
    }

    fn fetch_url(&self, _url: &str) -> Result<String, KiraError> {
        *self.url_calls.lock().unwrap() += 1;
        Ok(ARTICLE.to_string())
    }
}

struct FailingGeo;

impl GeoClient for FailingGeo {
    fn fetch_family_soft(&self, _accession: &GeoSeriesAccession) -> Result<String, KiraError> {
        Err(KiraError::GeoStatus {
            status: 404,
            message: "not found".to_string(),
        })
    }
}

fn temp_store() -> (tempfile::TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
    (temp, Store::new_with_root(root))
}

#[test]
fn series_extracts_each_sample() {
    let (_temp, store) = temp_store();
    let app = App::new(store, MockGeo::new(FAMILY), MockArticles::default());
    let accession: GeoSeriesAccession = "GSE1000".parse().unwrap();

    let result = app
        .series(
            &accession,
            &ExtractionConfig::default(),
            &SeriesOptions::default(),
            &JsonOutput,
        )
        .unwrap();

    assert_eq!(result.series, "GSE1000");
    assert_eq!(result.title, "Aging liver");
    assert_eq!(result.source, "geo");
    assert_eq!(result.samples.len(), 3);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].accession, "GSM2");
    assert_eq!(result.skipped[0].reason, SkipReason::Multichannel);

    let first = &result.samples[0];
    assert_eq!(first.accession, "GSM1");
    assert_eq!(first.age.value, Some(12.0));
    assert_eq!(first.age.source, Some(SourceTier::Sample));
    assert_eq!(first.sex, Some(Sex::Female));
    assert!(first.wild_type);
    assert!(!first.knockout);

    let knockout = &result.samples[1];
    assert_eq!(knockout.age.value, Some(20.0));
    assert_eq!(knockout.age.source, Some(SourceTier::Study));
    assert!(knockout.knockout);

    let cells = &result.samples[2];
    assert!(cells.cells);
    assert_eq!(cells.age.value, None);
    assert_eq!(cells.age.source, None);
}

#[test]
fn series_skips_by_configuration() {
    let (_temp, store) = temp_store();
    let app = App::new(store, MockGeo::new(FAMILY), MockArticles::default());
    let accession: GeoSeriesAccession = "GSE1000".parse().unwrap();

    let config = ExtractionConfig {
        keep_multichannel: true,
        keep_cells: false,
        ..ExtractionConfig::default()
    };
    let result = app
        .series(&accession, &config, &SeriesOptions::default(), &JsonOutput)
        .unwrap();
    let skipped = result
        .skipped
        .iter()
        .map(|skip| (skip.accession.as_str(), skip.reason))
        .collect::<Vec<_>>();
    assert_eq!(skipped, vec![("GSM4", SkipReason::CellCulture)]);

    let human = ExtractionConfig {
        organism: Some("Homo sapiens".to_string()),
        ..ExtractionConfig::default()
    };
    let result = app
        .series(&accession, &human, &SeriesOptions::default(), &JsonOutput)
        .unwrap();
    assert!(result.samples.is_empty());
    assert!(
        result
            .skipped
            .iter()
            .filter(|skip| skip.accession != "GSM2")
            .all(|skip| skip.reason == SkipReason::Organism)
    );
}

#[test]
fn series_falls_through_to_article_text() {
    let (_temp, store) = temp_store();
    let app = App::new(store, MockGeo::new(NO_AGE_FAMILY), MockArticles::default());
    let accession: GeoSeriesAccession = "GSE2000".parse().unwrap();

    let result = app
        .series(
            &accession,
            &ExtractionConfig::default(),
            &SeriesOptions::default(),
            &JsonOutput,
        )
        .unwrap();
    let age = result.samples[0].age;
    assert_eq!(age.value, Some(8.0));
    assert_eq!(age.source, Some(SourceTier::Text));
    assert!(!age.flagged);
}

#[test]
fn article_pages_are_cached_between_runs() {
    let (_temp, store) = temp_store();
    let articles = MockArticles::default();
    let geo = MockGeo::new(NO_AGE_FAMILY);
    let app = App::new(store, geo, articles.clone());
    let accession: GeoSeriesAccession = "GSE2000".parse().unwrap();
    let config = ExtractionConfig::default();

    for _ in 0..2 {
        let result = app
            .series(&accession, &config, &SeriesOptions::default(), &JsonOutput)
            .unwrap();
        assert_eq!(result.samples[0].age.value, Some(8.0));
    }
    assert_eq!(*articles.pubmed_calls.lock().unwrap(), 1);
    assert_eq!(*articles.url_calls.lock().unwrap(), 1);

    let no_cache = SeriesOptions { no_cache: true };
    let result = app
        .series(&accession, &config, &no_cache, &JsonOutput)
        .unwrap();
    assert_eq!(result.source, "geo");
    assert_eq!(*articles.pubmed_calls.lock().unwrap(), 2);
}

#[test]
fn cached_pages_record_their_source() {
    let (temp, store) = temp_store();
    let app = App::new(store, MockGeo::new(NO_AGE_FAMILY), MockArticles::default());
    let accession: GeoSeriesAccession = "GSE2000".parse().unwrap();
    app.series(
        &accession,
        &ExtractionConfig::default(),
        &SeriesOptions::default(),
        &JsonOutput,
    )
    .unwrap();

    let reader = Store::new_with_root(Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap());
    let url = "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC42/";
    let article = Store::read_metadata(&reader.metadata_path("article", url))
        .unwrap()
        .unwrap();
    assert_eq!(article.source, "article");
    assert_eq!(article.id, url);

    let pubmed = Store::read_metadata(&reader.metadata_path("pubmed", "31000000"))
        .unwrap()
        .unwrap();
    assert_eq!(pubmed.source, "pubmed");
}

#[test]
fn disabled_tiers_leave_age_missing() {
    let (_temp, store) = temp_store();
    let app = App::new(store, MockGeo::new(NO_AGE_FAMILY), MockArticles::default());
    let accession: GeoSeriesAccession = "GSE2000".parse().unwrap();

    let config = ExtractionConfig {
        try_text: false,
        ..ExtractionConfig::default()
    };
    let result = app
        .series(&accession, &config, &SeriesOptions::default(), &JsonOutput)
        .unwrap();
    assert_eq!(result.samples[0].age.value, None);
    assert_eq!(result.samples[0].age.source, Some(SourceTier::Study));

    let json = serde_json::to_value(&result.samples[0].age).unwrap();
    assert_eq!(json["value"], "n/a");
    assert_eq!(json["source"], "Study");
}

#[test]
fn geo_failure_propagates() {
    let (_temp, store) = temp_store();
    let app = App::new(store, FailingGeo, MockArticles::default());
    let accession: GeoSeriesAccession = "GSE1".parse().unwrap();
    let err = app
        .series(
            &accession,
            &ExtractionConfig::default(),
            &SeriesOptions::default(),
            &JsonOutput,
        )
        .unwrap_err();
    assert!(err.is_upstream());
}

#[test]
fn series_without_samples_is_an_error() {
    let (_temp, store) = temp_store();
    let app = App::new(
        store,
        MockGeo::new("^SERIES = GSE3\n!Series_title = empty\n"),
        MockArticles::default(),
    );
    let accession: GeoSeriesAccession = "GSE3".parse().unwrap();
    let err = app
        .series(
            &accession,
            &ExtractionConfig::default(),
            &SeriesOptions::default(),
            &JsonOutput,
        )
        .unwrap_err();
    assert_matches!(err, KiraError::EmptySeries(_));
}
