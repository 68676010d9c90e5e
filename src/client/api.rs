//! API client module
//!
//! Provides `ApiClient` for making JSON requests relative to a base URL.

use super::Auth;
use eyre::{Context, Result, eyre};
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

/// HTTP client bound to a base URL.
///
/// Paths passed to the request helpers are joined onto the base URL, so a
/// base of `https://api.example.com/prod/` and a path of `store_details/3`
/// requests `https://api.example.com/prod/store_details/3`.
///
/// # Example
/// ```no_run
/// use retail_centralizer::client::{ApiClient, Auth};
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("https://api.example.com/prod/")?;
/// let client = ApiClient::try_new(url, Auth::Apikey("key".to_string()))?;
/// let count = client.get_json("number_stores").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    url: Url,
}

impl ApiClient {
    /// Create a new client from a base URL and an authentication method.
    ///
    /// A trailing slash is added to the base URL when missing so joined paths
    /// extend it instead of replacing its last segment.
    ///
    /// # Errors
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built
    pub fn try_new(mut url: Url, auth: Auth) -> Result<Self> {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let mut headers = reqwest::header::HeaderMap::new();
        if let Auth::Apikey(apikey) = auth {
            headers.insert(
                "x-api-key",
                apikey
                    .parse::<reqwest::header::HeaderValue>()
                    .with_context(|| "Invalid API key header value")?,
            );
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .with_context(|| "Failed to build HTTP client")?;

        Ok(Self { client, url })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Resolve a path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.url
            .join(path)
            .with_context(|| format!("Invalid API path: {}", path))
    }

    /// Send a request and return the raw response.
    ///
    /// Query parameters embedded in `path` (`a=1&b=2`) are split out and
    /// sent with `.query()`.
    pub async fn request(&self, method: Method, path: &str) -> Result<reqwest::Response> {
        let builder = match path.split_once('?') {
            Some((p, query)) => {
                let query: Vec<_> = query.split('&').filter_map(|s| s.split_once('=')).collect();
                self.client.request(method, self.endpoint(p)?).query(&query)
            }
            None => self.client.request(method, self.endpoint(path)?),
        };

        builder
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request: {}", e))
    }

    /// GET a path and parse the body as JSON.
    ///
    /// # Errors
    /// Returns an error on transport failures, non-success statuses and
    /// bodies that are not JSON
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.request(Method::GET, path).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            eyre::bail!("GET {} failed ({}): {}", path, status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }
}

impl std::fmt::Display for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
