//! API client for the covid-api.com REST API.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::models::{CountryReport, DataEnvelope, GlobalStats, Region};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for all endpoints.
pub const DEFAULT_API_BASE_URL: &str = "https://covid-api.com/api";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// The three read-only endpoints the dashboard depends on.
pub trait ReportSource: Send + Sync {
    /// `GET /reports/total`
    fn global_summary(&self) -> BoxFuture<'_, Result<GlobalStats, ApiError>>;

    /// `GET /regions`, as returned (duplicates included)
    fn regions(&self) -> BoxFuture<'_, Result<Vec<Region>, ApiError>>;

    /// `GET /reports?iso={iso}`
    fn country_reports<'a>(
        &'a self,
        iso: &'a str,
    ) -> BoxFuture<'a, Result<Vec<CountryReport>, ApiError>>;
}

/// API client for covid-api.com.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client against `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// GET `path` and unwrap the `{ "data": ... }` envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, ?query, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .inspect_err(|e| error!(url = %url, error = %e, "Request failed"))?;

        let response = Self::check_response(response).await?;
        let body = response.text().await?;

        let envelope: DataEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            error!(url = %url, error = %e, "Failed to parse response");
            ApiError::InvalidResponse(format!("{}: {}", path, e))
        })?;
        Ok(envelope.data)
    }

    // ===== Data Fetching Methods =====

    /// Fetch worldwide totals
    pub async fn fetch_global_summary(&self) -> Result<GlobalStats, ApiError> {
        self.get("/reports/total", &[]).await
    }

    /// Fetch every region (country) the API knows about
    pub async fn fetch_regions(&self) -> Result<Vec<Region>, ApiError> {
        let regions: Vec<Region> = self.get("/regions", &[]).await?;
        debug!(count = regions.len(), "Regions fetched");
        Ok(regions)
    }

    /// Fetch per-province reports for one country
    pub async fn fetch_country_reports(&self, iso: &str) -> Result<Vec<CountryReport>, ApiError> {
        let reports: Vec<CountryReport> = self.get("/reports", &[("iso", iso)]).await?;
        debug!(iso, count = reports.len(), "Country reports fetched");
        Ok(reports)
    }
}

impl ReportSource for ApiClient {
    fn global_summary(&self) -> BoxFuture<'_, Result<GlobalStats, ApiError>> {
        self.fetch_global_summary().boxed()
    }

    fn regions(&self) -> BoxFuture<'_, Result<Vec<Region>, ApiError>> {
        self.fetch_regions().boxed()
    }

    fn country_reports<'a>(
        &'a self,
        iso: &'a str,
    ) -> BoxFuture<'a, Result<Vec<CountryReport>, ApiError>> {
        self.fetch_country_reports(iso).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("https://example.test/api/", Duration::from_secs(5))
            .expect("Failed to build client");
        assert_eq!(client.base_url(), "https://example.test/api");
        assert_eq!(client.url("/regions"), "https://example.test/api/regions");
    }

    #[test]
    fn test_parse_regions_envelope() {
        let json = r#"{"data":[{"iso":"CHN","name":"China"},{"iso":"TWN","name":"Taipei and environs"},{"iso":"CHN","name":"China"}]}"#;
        let envelope: DataEnvelope<Vec<Region>> =
            serde_json::from_str(json).expect("Failed to parse regions JSON");
        assert_eq!(envelope.data.len(), 3);
        assert_eq!(envelope.data[1], Region::new("TWN", "Taipei and environs"));
    }
}
