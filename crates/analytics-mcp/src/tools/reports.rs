//! Analytics reporting tools
//!
//! One data-driven table covers every operation: each entry pairs a tool
//! descriptor with a request-building kind, and a single generic handler
//! builds the request, issues the one remote call, normalizes the result,
//! and converts failures into `{"error": message}` payloads.

use crate::client::data::{
    DateRange, Dimension, Metric, RunRealtimeReportRequest, RunReportRequest,
};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Error payload message when the client handle is absent.
const NOT_INITIALIZED: &str =
    "Google Analytics client not initialized. Please check your environment variables.";

/// Static descriptor for one reporting operation.
pub struct ReportSpec {
    name: &'static str,
    title: &'static str,
    description: &'static str,
    prompt: &'static str,
    category: &'static str,
    kind: ReportKind,
}

/// How a spec's inputs map onto a report request.
enum ReportKind {
    /// Caller supplies date range, metrics, dimensions, and optional filters.
    Query,

    /// Realtime report; dimensions and metrics default when omitted.
    Realtime,

    /// Canned report with a fixed dimension/metric list.
    Canned {
        dimensions: &'static [&'static str],
        metrics: &'static [&'static str],
    },

    /// Fully generic report: filters, ordering, and limit accepted.
    Custom,
}

/// All supported reporting operations.
static REPORT_SPECS: &[ReportSpec] = &[
    ReportSpec {
        name: "query_analytics",
        title: "Query Analytics",
        description: "Query Google Analytics data with custom metrics, dimensions, and filters",
        prompt: "Show me sessions by country for last week",
        category: "reporting",
        kind: ReportKind::Query,
    },
    ReportSpec {
        name: "get_realtime_data",
        title: "Get Realtime Data",
        description: "Get real-time Google Analytics data",
        prompt: "How many users are online now?",
        category: "realtime",
        kind: ReportKind::Realtime,
    },
    ReportSpec {
        name: "get_traffic_sources",
        title: "Get Traffic Sources",
        description: "Get traffic source analysis data",
        prompt: "What are my top traffic sources?",
        category: "acquisition",
        kind: ReportKind::Canned {
            dimensions: &["sessionSource", "sessionMedium", "sessionCampaign"],
            metrics: &["sessions", "users", "newUsers", "bounceRate"],
        },
    },
    ReportSpec {
        name: "get_user_demographics",
        title: "Get User Demographics",
        description: "Get user demographics data",
        prompt: "Where are my users from?",
        category: "audience",
        kind: ReportKind::Canned {
            dimensions: &["userAgeBracket", "userGender", "country", "city"],
            metrics: &["users", "newUsers", "sessions", "averageSessionDuration"],
        },
    },
    ReportSpec {
        name: "get_page_performance",
        title: "Get Page Performance",
        description: "Get page performance metrics",
        prompt: "What are my most visited pages?",
        category: "behavior",
        kind: ReportKind::Canned {
            dimensions: &["pagePath", "pageTitle"],
            metrics: &[
                "screenPageViews",
                "uniquePageviews",
                "averageSessionDuration",
                "bounceRate",
                "exitRate",
            ],
        },
    },
    ReportSpec {
        name: "get_conversion_data",
        title: "Get Conversion Data",
        description: "Get conversion and event data",
        prompt: "Show me conversion events",
        category: "conversion",
        kind: ReportKind::Canned {
            dimensions: &["eventName", "conversionEventName"],
            metrics: &["eventCount", "conversions", "conversionRate", "totalRevenue"],
        },
    },
    ReportSpec {
        name: "get_custom_report",
        title: "Get Custom Report",
        description: "Get custom analytics report with flexible parameters",
        prompt: "Show me a custom report of new users by city for the last 30 days",
        category: "reporting",
        kind: ReportKind::Custom,
    },
];

impl ReportSpec {
    fn input_schema(&self) -> serde_json::Value {
        match &self.kind {
            ReportKind::Query => json!({
                "type": "object",
                "properties": {
                    "startDate": {
                        "type": "string",
                        "description": "Start date in YYYY-MM-DD format"
                    },
                    "endDate": {
                        "type": "string",
                        "description": "End date in YYYY-MM-DD format"
                    },
                    "metrics": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Metric names to query"
                    },
                    "dimensions": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Dimension names to query"
                    },
                    "filters": {
                        "type": "object",
                        "description": "Optional dimension filter expression"
                    }
                },
                "required": ["startDate", "endDate", "metrics", "dimensions"]
            }),
            ReportKind::Realtime => json!({
                "type": "object",
                "properties": {
                    "dimensions": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Dimension names (default: [\"country\"])"
                    },
                    "metrics": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Metric names (default: [\"activeUsers\"])"
                    }
                },
                "required": []
            }),
            ReportKind::Canned { .. } => json!({
                "type": "object",
                "properties": {
                    "startDate": {
                        "type": "string",
                        "description": "Start date in YYYY-MM-DD format"
                    },
                    "endDate": {
                        "type": "string",
                        "description": "End date in YYYY-MM-DD format"
                    }
                },
                "required": ["startDate", "endDate"]
            }),
            ReportKind::Custom => json!({
                "type": "object",
                "properties": {
                    "startDate": {
                        "type": "string",
                        "description": "Start date in YYYY-MM-DD format"
                    },
                    "endDate": {
                        "type": "string",
                        "description": "End date in YYYY-MM-DD format"
                    },
                    "metrics": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Metric names to query"
                    },
                    "dimensions": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Dimension names to query"
                    },
                    "filters": {
                        "type": "object",
                        "description": "Optional dimension filter expression"
                    },
                    "orderBys": {
                        "type": "array",
                        "description": "Optional ordering specification"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of rows to return"
                    }
                },
                "required": ["startDate", "endDate", "metrics", "dimensions"]
            }),
        }
    }
}

/// Generic handler executing one `ReportSpec`.
pub struct ReportTool {
    spec: &'static ReportSpec,
}

#[async_trait]
impl Tool for ReportTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.spec.name, self.spec.description)
            .with_title(self.spec.title)
            .with_prompt(self.spec.prompt)
            .with_category(self.spec.category)
            .with_schema(self.spec.input_schema())
    }

    #[instrument(skip(self, args, context), fields(tool = self.spec.name))]
    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        // Checked on every invocation: a handle that was never built must
        // produce a reported error, not a crash.
        let Some(client) = context.client() else {
            return Ok(ToolResult::error_json(NOT_INITIALIZED));
        };

        debug!("Running report for property {}", client.property_id());

        let outcome = match &self.spec.kind {
            ReportKind::Query => {
                let params: QueryParams = parse(args)?;
                client.run_report(&query_request(params)).await
            }
            ReportKind::Realtime => {
                let params: RealtimeParams = parse(args)?;
                client.run_realtime_report(&realtime_request(params)).await
            }
            ReportKind::Canned {
                dimensions,
                metrics,
            } => {
                let params: DateRangeParams = parse(args)?;
                client
                    .run_report(&canned_request(params, dimensions, metrics))
                    .await
            }
            ReportKind::Custom => {
                let params: CustomParams = parse(args)?;
                client.run_report(&custom_request(params)).await
            }
        };

        match outcome {
            Ok(envelope) => match serde_json::to_value(&envelope) {
                Ok(value) => Ok(ToolResult::json(value)),
                Err(e) => Err(McpServerError::Internal(e.to_string())),
            },
            Err(e) => {
                error!("Report failed: {}", e);
                Ok(ToolResult::error_json(e.to_string()))
            }
        }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(args: serde_json::Value) -> McpServerResult<T> {
    serde_json::from_value(args).map_err(|e| McpServerError::InvalidParams(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams {
    start_date: String,
    end_date: String,
    metrics: Vec<String>,
    dimensions: Vec<String>,
    filters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeParams {
    #[serde(default = "default_realtime_dimensions")]
    dimensions: Vec<String>,
    #[serde(default = "default_realtime_metrics")]
    metrics: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateRangeParams {
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomParams {
    start_date: String,
    end_date: String,
    metrics: Vec<String>,
    dimensions: Vec<String>,
    filters: Option<serde_json::Value>,
    order_bys: Option<serde_json::Value>,
    limit: Option<i64>,
}

fn default_realtime_dimensions() -> Vec<String> {
    vec!["country".to_string()]
}

fn default_realtime_metrics() -> Vec<String> {
    vec!["activeUsers".to_string()]
}

fn metric_names(names: Vec<String>) -> Vec<Metric> {
    names.into_iter().map(|name| Metric { name }).collect()
}

fn dimension_names(names: Vec<String>) -> Vec<Dimension> {
    names.into_iter().map(|name| Dimension { name }).collect()
}

fn fixed_metrics(names: &[&str]) -> Vec<Metric> {
    names
        .iter()
        .map(|name| Metric {
            name: name.to_string(),
        })
        .collect()
}

fn fixed_dimensions(names: &[&str]) -> Vec<Dimension> {
    names
        .iter()
        .map(|name| Dimension {
            name: name.to_string(),
        })
        .collect()
}

fn date_range(start_date: String, end_date: String) -> Vec<DateRange> {
    vec![DateRange {
        start_date,
        end_date,
    }]
}

fn query_request(params: QueryParams) -> RunReportRequest {
    RunReportRequest {
        date_ranges: date_range(params.start_date, params.end_date),
        metrics: metric_names(params.metrics),
        dimensions: dimension_names(params.dimensions),
        dimension_filter: params.filters,
        ..Default::default()
    }
}

fn realtime_request(params: RealtimeParams) -> RunRealtimeReportRequest {
    RunRealtimeReportRequest {
        dimensions: dimension_names(params.dimensions),
        metrics: metric_names(params.metrics),
    }
}

fn canned_request(
    params: DateRangeParams,
    dimensions: &[&str],
    metrics: &[&str],
) -> RunReportRequest {
    RunReportRequest {
        date_ranges: date_range(params.start_date, params.end_date),
        metrics: fixed_metrics(metrics),
        dimensions: fixed_dimensions(dimensions),
        ..Default::default()
    }
}

fn custom_request(params: CustomParams) -> RunReportRequest {
    RunReportRequest {
        date_ranges: date_range(params.start_date, params.end_date),
        metrics: metric_names(params.metrics),
        dimensions: dimension_names(params.dimensions),
        dimension_filter: params.filters,
        order_bys: params.order_bys,
        limit: params.limit,
    }
}

/// Get all reporting tools.
pub fn report_tools() -> Vec<Arc<dyn Tool>> {
    REPORT_SPECS
        .iter()
        .map(|spec| Arc::new(ReportTool { spec }) as Arc<dyn Tool>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_report_tools() {
        let tools = report_tools();
        assert_eq!(tools.len(), 7);
    }

    #[test]
    fn test_tool_names_unique() {
        let mut names = std::collections::HashSet::new();
        for tool in report_tools() {
            let def = tool.definition();
            assert!(names.insert(def.name.clone()), "Duplicate tool name: {}", def.name);
        }
    }

    #[test]
    fn test_query_schema_requires_metrics_and_dimensions() {
        let tool = report_tools()
            .into_iter()
            .find(|t| t.definition().name == "query_analytics")
            .unwrap();
        let schema = tool.definition().input_schema;
        let required: Vec<_> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(required, vec!["startDate", "endDate", "metrics", "dimensions"]);
    }

    #[test]
    fn test_query_request_matches_inputs() {
        let params: QueryParams = serde_json::from_value(json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-07",
            "metrics": ["sessions"],
            "dimensions": ["country"]
        }))
        .unwrap();
        let request = query_request(params);

        assert_eq!(request.date_ranges[0].start_date, "2024-01-01");
        assert_eq!(request.date_ranges[0].end_date, "2024-01-07");
        assert_eq!(request.metrics[0].name, "sessions");
        assert_eq!(request.dimensions[0].name, "country");
        assert!(request.dimension_filter.is_none());

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("dimensionFilter").is_none());
    }

    #[test]
    fn test_query_request_passes_filters_through() {
        let filter = json!({"filter": {"fieldName": "country", "stringFilter": {"value": "US"}}});
        let params: QueryParams = serde_json::from_value(json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-07",
            "metrics": ["sessions"],
            "dimensions": ["country"],
            "filters": filter.clone()
        }))
        .unwrap();
        let request = query_request(params);
        assert_eq!(request.dimension_filter, Some(filter));
    }

    #[test]
    fn test_realtime_defaults() {
        let params: RealtimeParams = serde_json::from_value(json!({})).unwrap();
        let request = realtime_request(params);
        assert_eq!(request.dimensions[0].name, "country");
        assert_eq!(request.metrics[0].name, "activeUsers");
    }

    #[test]
    fn test_realtime_explicit_fields_override_defaults() {
        let params: RealtimeParams = serde_json::from_value(json!({
            "dimensions": ["city"],
            "metrics": ["screenPageViews"]
        }))
        .unwrap();
        let request = realtime_request(params);
        assert_eq!(request.dimensions[0].name, "city");
        assert_eq!(request.metrics[0].name, "screenPageViews");
    }

    #[test]
    fn test_canned_request_uses_fixed_lists() {
        let params: DateRangeParams = serde_json::from_value(json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-31"
        }))
        .unwrap();
        let request = canned_request(
            params,
            &["sessionSource", "sessionMedium", "sessionCampaign"],
            &["sessions", "users", "newUsers", "bounceRate"],
        );
        assert_eq!(request.dimensions.len(), 3);
        assert_eq!(request.metrics.len(), 4);
        assert_eq!(request.dimensions[0].name, "sessionSource");
        assert_eq!(request.metrics[3].name, "bounceRate");
    }

    #[test]
    fn test_custom_request_includes_order_bys_and_limit() {
        let params: CustomParams = serde_json::from_value(json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-31",
            "metrics": ["newUsers"],
            "dimensions": ["city"],
            "orderBys": [{"metric": {"metricName": "newUsers"}, "desc": true}],
            "limit": 25
        }))
        .unwrap();
        let request = custom_request(params);

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("orderBys").is_some());
        assert_eq!(body["limit"], 25);
    }

    #[test]
    fn test_custom_request_omits_absent_keys() {
        let params: CustomParams = serde_json::from_value(json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-31",
            "metrics": ["newUsers"],
            "dimensions": ["city"]
        }))
        .unwrap();
        let request = custom_request(params);

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("orderBys").is_none());
        assert!(body.get("limit").is_none());
        assert!(body.get("dimensionFilter").is_none());
    }

    #[tokio::test]
    async fn test_all_tools_report_not_initialized_without_client() {
        let context = ToolContext::empty();
        for tool in report_tools() {
            let result = tool
                .execute(json!({}), &context)
                .await
                .expect("must not error at the protocol level");
            assert!(result.is_error);
            let payload: serde_json::Value =
                serde_json::from_str(result.first_text().unwrap()).unwrap();
            assert!(
                payload["error"].as_str().unwrap().contains("not initialized"),
                "unexpected payload for {}: {}",
                tool.definition().name,
                payload
            );
        }
    }
}
