use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::domain::{GeoSeriesAccession, Pmid};
use crate::error::KiraError;

#[derive(Debug, Clone)]
pub struct Store {
    cache_root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, KiraError> {
        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.home_dir().join(".cache").join("kira-metadata-extract"),
                )
                .ok()
            })
            .ok_or_else(|| {
                KiraError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self { cache_root })
    }

    pub fn new_with_root(cache_root: Utf8PathBuf) -> Self {
        Self { cache_root }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn soft_path(&self, accession: &GeoSeriesAccession) -> Utf8PathBuf {
        self.cache_root
            .join("soft")
            .join(format!("{}_family.soft", accession.as_str()))
    }

    pub fn pubmed_path(&self, pmid: &Pmid) -> Utf8PathBuf {
        self.cache_root
            .join("pubmed")
            .join(format!("{}.html", pmid.as_str()))
    }

    pub fn article_path(&self, url: &str) -> Utf8PathBuf {
        self.cache_root
            .join("articles")
            .join(format!("{}.html", cache_key(url)))
    }

    pub fn metadata_path(&self, kind: &str, id: &str) -> Utf8PathBuf {
        self.cache_root
            .join("metadata")
            .join(kind)
            .join(format!("{}.json", cache_key(id)))
    }

    pub fn ensure_cache_root(&self) -> Result<(), KiraError> {
        fs::create_dir_all(self.cache_root.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))
    }

    pub fn read_text(path: &Utf8Path) -> Result<Option<String>, KiraError> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        fs::read_to_string(path.as_std_path())
            .map(Some)
            .map_err(|err| KiraError::Filesystem(format!("read {path}: {err}")))
    }

    pub fn write_text_atomic(path: &Utf8Path, content: &str) -> Result<(), KiraError> {
        let parent = path
            .parent()
            .ok_or_else(|| KiraError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("kira-mx")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &Metadata) -> Result<(), KiraError> {
        let content = serde_json::to_string_pretty(metadata)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Self::write_text_atomic(path, &content)
    }

    pub fn read_metadata(path: &Utf8Path) -> Result<Option<Metadata>, KiraError> {
        let Some(content) = Self::read_text(path)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| KiraError::Filesystem(format!("parse {path}: {err}")))
    }

    pub fn cache_text(
        &self,
        path: &Utf8Path,
        kind: &str,
        id: &str,
        source: &str,
        content: &str,
    ) -> Result<(), KiraError> {
        Self::write_text_atomic(path, content)?;
        let metadata = Metadata {
            source: source.to_string(),
            kind: kind.to_string(),
            id: id.to_string(),
            fetched_at: iso_timestamp(),
            tool: format!("kira-mx/{}", env!("CARGO_PKG_VERSION")),
            resolved_path: path.to_string(),
        };
        Self::write_metadata(&self.metadata_path(kind, id), &metadata)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    pub kind: String,
    pub id: String,
    pub fetched_at: String,
    pub tool: String,
    pub resolved_path: String,
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn cache_key(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    trimmed
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' { ch } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}
