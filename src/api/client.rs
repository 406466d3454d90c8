use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::auth::TokenCredential;
use crate::config::ApiConfig;

/// Microsoft Graph v1.0 endpoint
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Upper bound on `@odata.nextLink` hops for a single collection
const MAX_PAGES: usize = 100;

/// Percent-encode an id for use as a single path segment
pub fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

/// One GET against a Graph resource path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRequest {
    /// Path relative to the API root, e.g. `/me/chats`
    pub path: String,
    /// OData `$filter` predicate
    pub filter: Option<String>,
    /// `startDateTime`/`endDateTime` window for calendar views
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl GraphRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filter: None,
            range: None,
        }
    }

    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.filter = Some(predicate.into());
        self
    }

    pub fn range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.range = Some((start, end));
        self
    }

    /// Query parameters in the order they are sent
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some((start, end)) = &self.range {
            params.push((
                "startDateTime",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
            params.push(("endDateTime", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(filter) = &self.filter {
            params.push(("$filter", filter.clone()));
        }
        params
    }

    /// Absolute URL under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        let query = self.query();
        if !query.is_empty() {
            let encoded: Vec<String> = query
                .iter()
                .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
                .collect();
            url.push('?');
            url.push_str(&encoded.join("&"));
        }
        url
    }
}

/// The typed-client seam the accessors are written against
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Fetch a single resource. `Value::Null` means the service returned no body.
    async fn get_object(&self, request: &GraphRequest) -> Result<Value>;

    /// Fetch every item of a collection, following server-side paging.
    async fn get_collection(&self, request: &GraphRequest) -> Result<Vec<Value>>;
}

/// Authenticated HTTP client for Microsoft Graph
pub struct GraphClient {
    http: Client,
    base_url: String,
    credential: Arc<dyn TokenCredential>,
    scopes: Vec<String>,
}

impl GraphClient {
    /// Create a client that requests `scopes` from `credential` on every call
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        scopes: Vec<String>,
        settings: &ApiConfig,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            http: builder.build().context("Failed to build HTTP client")?,
            base_url: settings.base_url.clone(),
            credential,
            scopes,
        })
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let token = self.credential.get_token(&self.scopes).await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {}", token.value))?,
        );
        // Event times come back in UTC so calendar windows can be checked locally
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("outlook.timezone=\"UTC\""),
        );
        Ok(headers)
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let headers = self.headers().await?;
        debug!(url, "GET");

        let res = self.http.get(url).headers(headers).send().await?;

        if res.status().is_success() {
            let body = res.text().await?;
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&body).context("Failed to parse response body")
        } else {
            let status = res.status();
            let body = res.text().await?;
            Err(anyhow!("{} - {}", status, body))
        }
    }
}

#[async_trait]
impl GraphTransport for GraphClient {
    async fn get_object(&self, request: &GraphRequest) -> Result<Value> {
        self.get_json(&request.url(&self.base_url)).await
    }

    async fn get_collection(&self, request: &GraphRequest) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut url = request.url(&self.base_url);

        for _ in 0..MAX_PAGES {
            let page = self.get_json(&url).await?;
            let (values, next_link) = split_page(page)?;
            items.extend(values);

            match next_link {
                Some(next) => url = next,
                None => return Ok(items),
            }
        }

        Err(anyhow!(
            "Collection {} exceeded {} pages",
            request.path,
            MAX_PAGES
        ))
    }
}

/// Split a collection page into its items and the next page link
fn split_page(page: Value) -> Result<(Vec<Value>, Option<String>)> {
    let Value::Object(mut page) = page else {
        return Err(anyhow!("Expected a collection object"));
    };

    let next_link = page
        .remove("@odata.nextLink")
        .and_then(|v| v.as_str().map(str::to_string));

    match page.remove("value") {
        Some(Value::Array(values)) => Ok((values, next_link)),
        _ => Err(anyhow!("Collection response has no value array")),
    }
}
