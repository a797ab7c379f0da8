//! Cloudability v3 cost reporting API client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::models::{parse_measures, CloudabilityError, CloudabilityReport};
use crate::error::{CostReportError, Result};
use crate::measures::Measure;
use crate::providers::{MeasureSource, ReportTransport};
use crate::query::RawRow;

/// Default API host.
pub const CLOUDABILITY_API_HOST: &str = "api.cloudability.com";

const MEASURES_ENDPOINT: &str = "/v3/reporting/cost/measures";
const REPORT_ENDPOINT: &str = "/v3/reporting/cost/run";

/// Cloudability cost reporting client.
///
/// Authenticates with HTTP basic auth, the API token as user name and an
/// empty password.
#[derive(Debug, Clone)]
pub struct CloudabilityClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CloudabilityClient {
    /// Create a client for the default API host.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_host(token, CLOUDABILITY_API_HOST)
    }

    /// Create a client for a regional host such as `api-eu.cloudability.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty.
    pub fn with_host(token: impl Into<String>, host: &str) -> Result<Self> {
        Self::with_base_url(token, format!("https://{host}"))
    }

    /// Create a client against an arbitrary base URL (scheme and host).
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be built.
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(CostReportError::Auth(
                "Cloudability API token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(concat!("cost-attribution/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CostReportError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Make a GET request and return the JSON body.
    async fn get(&self, endpoint: &str, query: Option<&str>) -> Result<Value> {
        let url = match query {
            Some(query) => format!("{}{endpoint}?{query}", self.base_url),
            None => format!("{}{endpoint}", self.base_url),
        };
        debug!(url = %url, "Making Cloudability API request");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.token, Some(""))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<CloudabilityError>(&error_text)
                .map_or(error_text, |error| error.message());
            return Err(CostReportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            CostReportError::MalformedResponse(format!("response is not JSON: {e}"))
        })
    }
}

#[async_trait]
impl ReportTransport for CloudabilityClient {
    fn name(&self) -> &'static str {
        "cloudability"
    }

    #[instrument(skip(self), fields(provider = "cloudability"))]
    async fn run_report(&self, query: &str) -> Result<Vec<RawRow>> {
        let body = self.get(REPORT_ENDPOINT, Some(query)).await?;
        let report = CloudabilityReport::from_value(body)?;
        debug!(rows = report.results.len(), "Received report rows");
        Ok(report.results)
    }
}

#[async_trait]
impl MeasureSource for CloudabilityClient {
    #[instrument(skip(self), fields(provider = "cloudability"))]
    async fn fetch_measures(&self) -> Result<Vec<Measure>> {
        let body = self.get(MEASURES_ENDPOINT, None).await?;
        parse_measures(body)
    }
}
