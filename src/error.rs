use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid time unit: {0} (expected one of day, week, month, year)")]
    InvalidUnit(String),

    #[error("invalid article section: {0}")]
    #[diagnostic(help("try one of: abstract, intro, introduction, methods, procedures, results, discussion, conclusions"))]
    InvalidSection(String),

    #[error("invalid header style: {0}")]
    InvalidHeaderStyle(String),

    #[error("invalid GEO series accession: {0}")]
    InvalidSeriesAccession(String),

    #[error("invalid PubMed id: {0}")]
    InvalidPmid(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("GEO request failed: {0}")]
    GeoHttp(String),

    #[error("GEO returned status {status}: {message}")]
    GeoStatus { status: u16, message: String },

    #[error("article request failed: {0}")]
    ArticleHttp(String),

    #[error("article host returned status {status}: {message}")]
    ArticleStatus { status: u16, message: String },

    #[error("malformed SOFT record: {0}")]
    SoftParse(String),

    #[error("series {0} has no samples")]
    EmptySeries(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl KiraError {
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            KiraError::GeoHttp(_)
                | KiraError::GeoStatus { .. }
                | KiraError::ArticleHttp(_)
                | KiraError::ArticleStatus { .. }
        )
    }
}
