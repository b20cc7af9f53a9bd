use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Pmid;
use crate::error::KiraError;

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#).expect("valid href regex"));
static LINKS_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)full[ \-]text[ \-]links").expect("valid marker regex"));

pub trait ArticleClient: Send + Sync {
    fn fetch_pubmed_page(&self, pmid: &Pmid) -> Result<String, KiraError>;
    fn fetch_url(&self, url: &str) -> Result<String, KiraError>;
}

#[derive(Clone)]
pub struct PubmedHttpClient {
    client: Client,
    base_url: String,
}

impl PubmedHttpClient {
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
            .map_err(|err| KiraError::ArticleHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: "https://pubmed.ncbi.nlm.nih.gov".to_string(),
        })
    }

    fn get_text(&self, url: &str) -> Result<String, KiraError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "article request failed".to_string());
            return Err(KiraError::ArticleStatus { status, message });
        }
        response
            .text()
            .map_err(|err| KiraError::ArticleHttp(err.to_string()))
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, KiraError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        tracing::debug!(status, attempt, "retrying article request");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        tracing::debug!(%err, attempt, "retrying article request");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(KiraError::ArticleHttp(err.to_string()));
                }
            }
        }
    }
}

impl ArticleClient for PubmedHttpClient {
    fn fetch_pubmed_page(&self, pmid: &Pmid) -> Result<String, KiraError> {
        self.get_text(&format!("{}/{}/", self.base_url, pmid.as_str()))
    }

    fn fetch_url(&self, url: &str) -> Result<String, KiraError> {
        self.get_text(url)
    }
}

pub fn full_text_links(page: &str) -> Vec<String> {
    let Some(marker) = LINKS_MARKER_RE.find(page) else {
        return Vec::new();
    };
    let region = &page[marker.end()..];
    let region = region
        .find("</ul>")
        .map(|end| &region[..end])
        .unwrap_or(region);

    let mut links = Vec::new();
    for caps in HREF_RE.captures_iter(region) {
        let href = caps[1].trim();
        if href.starts_with("http") && !links.iter().any(|known: &String| known == href) {
            links.push(href.to_string());
        }
    }
    links
}

pub fn prefer_pmc(links: Vec<String>, pmc_preference: bool) -> Vec<String> {
    if !pmc_preference || links.len() < 2 {
        return links;
    }
    let pmc = links
        .iter()
        .filter(|link| is_pmc_link(link))
        .cloned()
        .collect::<Vec<_>>();
    if pmc.len() > 1 {
        tracing::warn!(count = pmc.len(), "several PMC links for one article");
    }
    if pmc.is_empty() { links } else { pmc }
}

fn is_pmc_link(link: &str) -> bool {
    let lowered = link.to_lowercase();
    lowered.contains("/pmc/") || lowered.contains("pmc.ncbi.nlm.nih.gov")
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
