//! GA4 Data API client.
//!
//! HTTP client for the Google Analytics Data API (v1beta). The client is
//! constructed once at startup, bound to a single property id, and immutable
//! afterwards. Each report method issues exactly one HTTP call; there is no
//! retry or pagination.

use super::auth::{AuthError, Credentials, TokenProvider};
use crate::config::GaConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// Analytics client errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error response. Displays the API's own message;
    /// the status code is carried for logging.
    #[error("{message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Authentication failed.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Token acquisition failed.
    #[error("Token acquisition failed: {0}")]
    Token(#[from] AuthError),
}

/// GA4 Data API client.
///
/// Holds credentials and the target property id. Read-only after
/// construction, so it is safe to share across invocations via `Arc`.
pub struct AnalyticsDataClient {
    /// HTTP client instance.
    http: Client,

    /// Access token provider.
    tokens: TokenProvider,

    /// Data API base URL.
    base_url: String,

    /// GA4 property id.
    property_id: String,
}

impl AnalyticsDataClient {
    /// Create a new client bound to the configured property.
    pub fn new(config: &GaConfig, credentials: Credentials) -> Result<Self, AnalyticsError> {
        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            tokens: TokenProvider::new(credentials, http.clone()),
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            property_id: config.property_id.clone(),
        })
    }

    /// The property id this client queries.
    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    /// Run a core report.
    #[instrument(skip(self, request))]
    pub async fn run_report(
        &self,
        request: &RunReportRequest,
    ) -> Result<ReportEnvelope, AnalyticsError> {
        self.post("runReport", request).await
    }

    /// Run a realtime report.
    #[instrument(skip(self, request))]
    pub async fn run_realtime_report(
        &self,
        request: &RunRealtimeReportRequest,
    ) -> Result<ReportEnvelope, AnalyticsError> {
        self.post("runRealtimeReport", request).await
    }

    async fn post<B>(&self, method: &str, body: &B) -> Result<ReportEnvelope, AnalyticsError>
    where
        B: Serialize + ?Sized,
    {
        let token = self.tokens.token().await?;
        let url = format!(
            "{}/v1beta/properties/{}:{}",
            self.base_url, self.property_id, method
        );
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response, normalizing absent fields to empty/zero.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<ReportEnvelope, AnalyticsError> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            error!("GA4 authentication failed");
            return Err(AnalyticsError::AuthenticationFailed);
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = extract_api_message(&body).unwrap_or(body);
            warn!("GA4 API error ({}): {}", status.as_u16(), message);
            return Err(AnalyticsError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let report: ReportResponse = response
            .json()
            .await
            .map_err(|e| AnalyticsError::InvalidResponse(e.to_string()))?;

        Ok(ReportEnvelope {
            rows: report.rows,
            totals: report.totals,
            row_count: report.row_count,
        })
    }
}

/// Pull the message out of a GA4 error body (`{"error": {"message": ...}}`).
fn extract_api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(String::from)
}

/// A single date range in a report request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Start date (YYYY-MM-DD).
    pub start_date: String,

    /// End date (YYYY-MM-DD).
    pub end_date: String,
}

/// A metric selection by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name (e.g. "sessions").
    pub name: String,
}

/// A dimension selection by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    /// Dimension name (e.g. "country").
    pub name: String,
}

/// Request body for `runReport`.
///
/// Optional fields are skipped entirely when absent so the serialized body
/// never carries null placeholders.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    /// Date ranges to query.
    pub date_ranges: Vec<DateRange>,

    /// Metrics to report.
    pub metrics: Vec<Metric>,

    /// Dimensions to break down by.
    pub dimensions: Vec<Dimension>,

    /// Dimension filter expression, passed through opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<serde_json::Value>,

    /// Ordering specification, passed through opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_bys: Option<serde_json::Value>,

    /// Maximum number of rows to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Request body for `runRealtimeReport`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRealtimeReportRequest {
    /// Dimensions to break down by.
    pub dimensions: Vec<Dimension>,

    /// Metrics to report.
    pub metrics: Vec<Metric>,
}

/// Raw API response; every field may be absent when the report is empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    #[serde(default)]
    rows: Vec<ReportRow>,

    #[serde(default)]
    totals: Vec<ReportRow>,

    #[serde(default)]
    row_count: i64,
}

/// One report row: ordered dimension values followed by metric values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    /// Dimension values, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimension_values: Vec<ReportValue>,

    /// Metric values, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_values: Vec<ReportValue>,
}

/// A single cell value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportValue {
    /// The value as returned by the API.
    #[serde(default)]
    pub value: String,
}

/// Normalized report result handed back to the host.
///
/// Missing rows, totals, or row count in the API response are defaulted to
/// an empty sequence / zero before this envelope is built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEnvelope {
    /// Result rows.
    pub rows: Vec<ReportRow>,

    /// Total/aggregate rows.
    pub totals: Vec<ReportRow>,

    /// Total row count.
    pub row_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_absent_optionals() {
        let request = RunReportRequest {
            date_ranges: vec![DateRange {
                start_date: "2024-01-01".to_string(),
                end_date: "2024-01-07".to_string(),
            }],
            metrics: vec![Metric {
                name: "sessions".to_string(),
            }],
            dimensions: vec![Dimension {
                name: "country".to_string(),
            }],
            ..Default::default()
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["dateRanges"][0]["startDate"], "2024-01-01");
        assert!(value.get("dimensionFilter").is_none());
        assert!(value.get("orderBys").is_none());
        assert!(value.get("limit").is_none());
    }

    #[test]
    fn test_empty_response_normalizes() {
        let report: ReportResponse = serde_json::from_value(json!({})).unwrap();
        assert!(report.rows.is_empty());
        assert!(report.totals.is_empty());
        assert_eq!(report.row_count, 0);
    }

    #[test]
    fn test_rows_round_trip() {
        let report: ReportResponse = serde_json::from_value(json!({
            "rows": [{
                "dimensionValues": [{"value": "United States"}],
                "metricValues": [{"value": "1200"}]
            }],
            "rowCount": 1
        }))
        .unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].dimension_values[0].value, "United States");
        assert_eq!(report.row_count, 1);
    }

    #[test]
    fn test_extract_api_message() {
        let body = r#"{"error": {"code": 403, "message": "permission denied", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(extract_api_message(body).as_deref(), Some("permission denied"));
        assert_eq!(extract_api_message("not json"), None);
    }

    #[test]
    fn test_api_error_displays_message_only() {
        let err = AnalyticsError::ApiError {
            status: 403,
            message: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "permission denied");
    }
}
