//! Blocking STAC API client
//!
//! Searches go through the `CatalogSearch` trait so that the drill loop can
//! be run against a scripted catalogue in tests.

use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use reqwest::blocking::{Client, Response};
use serde_json::Value;

use super::models::{FeatureCollection, Link, SearchBody};
use crate::coordinate::BoundingBox;
use crate::errors::{DrillError, DrillResult};
use crate::item::CatalogItem;

/// Items requested per page
pub const DEFAULT_PAGE_LIMIT: u32 = 500;

/// One spatio-temporal search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub collections: Vec<String>,
    /// Area of interest in WGS 84
    pub bbox: BoundingBox,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Query extension object, see `filter::build_query`
    pub query: Option<Value>,
    /// Assets every returned item must carry
    pub assets: Vec<String>,
}

impl SearchRequest {
    /// `start/end` interval in RFC 3339
    pub fn datetime_interval(&self) -> String {
        format!(
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// A catalogue that can be searched for items
pub trait CatalogSearch: Send + Sync {
    /// Returns the matching items in catalogue order
    fn search(&self, request: &SearchRequest) -> DrillResult<Vec<CatalogItem>>;
}

/// Options for `StacClient`
#[derive(Debug, Clone)]
pub struct StacClientOptions {
    pub timeout: Duration,
    /// Retries of a page request after a network or server error
    pub max_retries: u32,
    pub page_limit: u32,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        StacClientOptions {
            timeout: Duration::from_secs(60),
            max_retries: 3,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Client for a STAC API endpoint
pub struct StacClient {
    endpoint: String,
    client: Client,
    options: StacClientOptions,
}

impl StacClient {
    /// Creates a client for the API rooted at `endpoint`
    pub fn new(endpoint: &str, options: StacClientOptions) -> DrillResult<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| DrillError::Catalog(format!("failed to build HTTP client: {}", e)))?;
        Ok(StacClient {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            options,
        })
    }

    /// URL of the item search endpoint
    pub fn search_url(&self) -> String {
        if self.endpoint.ends_with("/search") {
            self.endpoint.clone()
        } else {
            format!("{}/search", self.endpoint)
        }
    }

    fn body_for(&self, request: &SearchRequest) -> SearchBody {
        SearchBody {
            collections: request.collections.clone(),
            bbox: Some(request.bbox.to_array()),
            datetime: Some(request.datetime_interval()),
            query: request.query.clone(),
            limit: Some(self.options.page_limit),
            ..Default::default()
        }
    }

    fn post_page(&self, url: &str, body: &SearchBody) -> DrillResult<FeatureCollection> {
        self.with_retries(url, || self.client.post(url).json(body).send())
    }

    fn get_page(&self, url: &str) -> DrillResult<FeatureCollection> {
        self.with_retries(url, || self.client.get(url).send())
    }

    /// Sends a request, retrying network and server errors with backoff
    fn with_retries<F>(&self, url: &str, send: F) -> DrillResult<FeatureCollection>
    where
        F: Fn() -> reqwest::Result<Response>,
    {
        let mut last_error = String::new();
        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!("Retrying {} in {:?} after: {}", url, delay, last_error);
                thread::sleep(delay);
            }
            match send() {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json::<FeatureCollection>()?);
                }
                Ok(response) => {
                    let status = response.status();
                    let text: String = response.text().unwrap_or_default().chars().take(500).collect();
                    last_error = format!("HTTP {} from {}: {}", status, url, text);
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => last_error = format!("request to {} failed: {}", url, e),
            }
        }
        Err(DrillError::Catalog(last_error))
    }

    fn next_page(&self, link: &Link, previous: &SearchBody) -> DrillResult<FeatureCollection> {
        let method = link.method.as_deref().unwrap_or("GET");
        if !method.eq_ignore_ascii_case("POST") {
            return self.get_page(&link.href);
        }
        let body = match &link.body {
            Some(link_body) if link.merge => {
                let mut merged = previous.clone();
                merged.extra.extend(link_body.clone());
                merged
            }
            Some(link_body) => serde_json::from_value(Value::Object(link_body.clone()))?,
            None => previous.clone(),
        };
        self.post_page(&link.href, &body)
    }
}

impl CatalogSearch for StacClient {
    fn search(&self, request: &SearchRequest) -> DrillResult<Vec<CatalogItem>> {
        let body = self.body_for(request);
        debug!("STAC search {}: {}", self.search_url(), serde_json::to_string(&body)?);

        let mut page = self.post_page(&self.search_url(), &body)?;
        let mut items = Vec::new();
        loop {
            let next = page.next_link().cloned();
            for feature in page.features.drain(..) {
                let item = feature.into_catalog_item();
                if item.has_assets(&request.assets) {
                    items.push(item);
                } else {
                    warn!("Skipping item '{}' which lacks one of the assets {:?}", item.id, request.assets);
                }
            }
            match next {
                Some(link) => {
                    page = self.next_page(&link, &body)?;
                    if page.features.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }
        info!("STAC search for {} found {} items", request.datetime_interval(), items.len());
        Ok(items)
    }
}
