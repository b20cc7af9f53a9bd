use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::GeoSeriesAccession;
use crate::error::KiraError;

pub trait GeoClient: Send + Sync {
    fn fetch_family_soft(&self, accession: &GeoSeriesAccession) -> Result<String, KiraError>;
}

#[derive(Clone)]
pub struct GeoHttpClient {
    client: Client,
}

impl GeoHttpClient {
    pub fn new() -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-mx/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::Filesystem(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| KiraError::GeoHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl GeoClient for GeoHttpClient {
    fn fetch_family_soft(&self, accession: &GeoSeriesAccession) -> Result<String, KiraError> {
        let url = family_soft_url(accession);
        tracing::info!(%accession, %url, "downloading SOFT family");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| KiraError::GeoHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GEO request failed".to_string());
            return Err(KiraError::GeoStatus { status, message });
        }
        let bytes = response
            .bytes()
            .map_err(|err| KiraError::GeoHttp(err.to_string()))?;
        gunzip_text(bytes.as_ref())
    }
}

pub fn gunzip_text(bytes: &[u8]) -> Result<String, KiraError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|err| KiraError::SoftParse(format!("gzip: {err}")))?;
    Ok(text)
}

pub fn family_soft_url(accession: &GeoSeriesAccession) -> String {
    let prefix = geo_series_prefix(accession);
    format!(
        "https://ftp.ncbi.nlm.nih.gov/geo/series/{prefix}/{acc}/soft/{acc}_family.soft.gz",
        acc = accession.as_str()
    )
}

pub fn geo_series_prefix(accession: &GeoSeriesAccession) -> String {
    let digits = accession.as_str().trim_start_matches("GSE");
    if digits.len() <= 3 {
        return "GSEnnn".to_string();
    }
    let head = &digits[..digits.len() - 3];
    format!("GSE{}nnn", head)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn series_prefixes() {
        let short: GeoSeriesAccession = "GSE12".parse().unwrap();
        let long: GeoSeriesAccession = "GSE102902".parse().unwrap();
        assert_eq!(geo_series_prefix(&short), "GSEnnn");
        assert_eq!(geo_series_prefix(&long), "GSE102nnn");
        assert_eq!(
            family_soft_url(&long),
            "https://ftp.ncbi.nlm.nih.gov/geo/series/GSE102nnn/GSE102902/soft/GSE102902_family.soft.gz"
        );
    }

    #[test]
    fn gunzip_roundtrip_and_garbage() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"^SERIES = GSE1\n").unwrap();
        let bytes = encoder.finish().unwrap();
        assert_eq!(gunzip_text(&bytes).unwrap(), "^SERIES = GSE1\n");
        assert!(gunzip_text(b"not gzip").is_err());
    }
}
