//! Wikipedia reference source
//!
//! Uses the REST page-summary endpoint
//! (`{base}/page/summary/{title}`) and extracts:
//! - the plain-text summary as supplementary biography
//! - nationality from the short description ("Dutch painter (1609–1660)")
//! - life years from the description or summary
//! - movements mentioned in the summary
//!
//! Disambiguation pages and titles that do not closely match the queried
//! name are treated as "no match". Requests are rate limited with a
//! governor token bucket (Wikimedia asks clients to stay gentle).

use governor::{Quota, RateLimiter};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use super::{ReferenceFacts, ReferenceSource};
use crate::error::{ClassifyError, ClassifyResult};
use crate::normalizer::name_key;
use crate::scoring::heuristic::{canonical_nationality, movements_in_text};

/// Minimum Jaro-Winkler similarity between query and page title
pub const MIN_TITLE_SIMILARITY: f64 = 0.85;

static YEARS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(1[0-9]{3}|20[0-9]{2})\s*[–—-]\s*(1[0-9]{3}|20[0-9]{2})\b")
        .expect("years pattern is valid")
});

static BORN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bborn\s+(?:[^0-9]{0,30})?(1[0-9]{3}|20[0-9]{2})\b").expect("born pattern is valid"));

/// REST page summary response
#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    page_type: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

/// Wikipedia REST client
pub struct WikipediaSource {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl WikipediaSource {
    /// Create a client against `base_url` (e.g. "https://en.wikipedia.org/api/rest_v1")
    pub fn new(
        base_url: &str,
        user_agent: &str,
        timeout: Duration,
        requests_per_second: u32,
    ) -> ClassifyResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClassifyError::external("wikipedia", format!("HTTP client build failed: {}", e)))?;

        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn summary_url(&self, name: &str) -> ClassifyResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClassifyError::external("wikipedia", format!("bad base URL: {}", e)))?;
        let title = name.trim().replace(' ', "_");
        url.path_segments_mut()
            .map_err(|_| ClassifyError::external("wikipedia", "base URL cannot have path segments"))?
            .extend(["page", "summary", title.as_str()]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ReferenceSource for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn lookup(&self, name: &str) -> ClassifyResult<Option<ReferenceFacts>> {
        self.rate_limiter.until_ready().await;

        let url = self.summary_url(name)?;
        debug!(url = %url, "Wikipedia summary lookup");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClassifyError::external("wikipedia", e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClassifyError::external(
                "wikipedia",
                format!("HTTP {}", response.status()),
            ));
        }

        let summary: PageSummary = response
            .json()
            .await
            .map_err(|e| ClassifyError::external("wikipedia", format!("response decode failed: {}", e)))?;

        Ok(facts_from_summary(name, summary))
    }
}

/// Turn a page summary into facts, or `None` when it is not a match
fn facts_from_summary(query: &str, summary: PageSummary) -> Option<ReferenceFacts> {
    if summary.page_type == "disambiguation" {
        debug!(title = %summary.title, "Skipping disambiguation page");
        return None;
    }

    let similarity = strsim::jaro_winkler(&name_key(query), &name_key(&summary.title));
    if similarity < MIN_TITLE_SIMILARITY {
        debug!(
            query = %query,
            title = %summary.title,
            similarity,
            "Reference title too different from query"
        );
        return None;
    }

    let extract = summary.extract.trim().to_string();
    if extract.is_empty() {
        return None;
    }

    let description = summary.description.unwrap_or_default();
    let nationality = canonical_nationality(&description)
        .or_else(|| first_sentence(&extract).and_then(canonical_nationality))
        .map(capitalize);

    let (birth_year, death_year) = life_years(&description)
        .or_else(|| life_years(&extract))
        .map(|(b, d)| (Some(b), Some(d)))
        .unwrap_or_else(|| (born_year(&extract), None));

    Some(ReferenceFacts {
        title: summary.title,
        movements: movements_in_text(&extract)
            .into_iter()
            .map(|key| key.replace('_', " "))
            .collect(),
        summary: extract,
        nationality,
        birth_year,
        death_year,
        source_url: summary
            .content_urls
            .and_then(|urls| urls.desktop)
            .and_then(|desktop| desktop.page),
    })
}

fn first_sentence(text: &str) -> Option<&str> {
    text.split(". ").next()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn life_years(text: &str) -> Option<(i32, i32)> {
    let caps = YEARS_RE.captures(text)?;
    let birth: i32 = caps.get(1)?.as_str().parse().ok()?;
    let death: i32 = caps.get(2)?.as_str().parse().ok()?;
    (birth <= death && death - birth <= 110).then_some((birth, death))
}

fn born_year(text: &str) -> Option<i32> {
    BORN_RE.captures(&text.to_lowercase())?.get(1)?.as_str().parse().ok()
}
