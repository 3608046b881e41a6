use reqwest::{Client, header};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use steward_core::tool::{Error as ToolError, Tool, ToolResult};

/// Search endpoint of the Tavily API.
pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

const MAX_RESULTS: u32 = 4;

/// Input of [`WebSearchTool`].
#[derive(Deserialize, JsonSchema)]
pub struct WebSearchParameters {
    #[schemars(description = "The search query.")]
    input: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// One hit of a web search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the page.
    pub title: String,
    /// Address of the page.
    pub url: String,
    /// The part of the page relevant to the query.
    pub content: String,
    /// Relevance, higher is better.
    #[serde(default)]
    pub score: f64,
}

fn parse_results(body: &str) -> Result<Vec<SearchResult>, serde_json::Error> {
    let resp: SearchResponse = serde_json::from_str(body)?;
    Ok(resp.results)
}

/// A tool that searches the web through Tavily and returns the results as
/// a JSON array.
#[derive(Clone)]
pub struct WebSearchTool {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    parameter_schema: Value,
}

impl WebSearchTool {
    /// Creates the tool. Without an API key every search fails with an
    /// error the model can read.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|key| !key.is_empty()),
            endpoint: TAVILY_SEARCH_URL.to_owned(),
            parameter_schema: schema_for!(WebSearchParameters).to_value(),
        }
    }

    /// Sends searches to `endpoint` instead of the public API.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Tool for WebSearchTool {
    type Input = WebSearchParameters;

    fn name(&self) -> &str {
        "tavily_search_results_json"
    }

    fn description(&self) -> &str {
        "A search engine optimized for comprehensive, accurate, and trusted \
         results. Useful for when you need to answer questions about current \
         events. Input should be a search query."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: WebSearchParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let endpoint = self.endpoint.clone();

        async move {
            let Some(api_key) = api_key else {
                return Err(ToolError::execution_error()
                    .with_reason("TAVILY_API_KEY is not set"));
            };
            info!("searching the web for `{}`", input.input);

            let resp = client
                .post(&endpoint)
                .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
                .json(&SearchRequest {
                    query: &input.input,
                    max_results: MAX_RESULTS,
                })
                .send()
                .await
                .map_err(|err| {
                    ToolError::execution_error()
                        .with_reason(format!("search request failed: {err}"))
                })?;

            let status = resp.status();
            let body = resp.text().await.map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("failed to read search response: {err}"))
            })?;
            if !status.is_success() {
                warn!("search failed with {status}: {body}");
                return Err(ToolError::execution_error()
                    .with_reason(format!("search failed with status {status}")));
            }

            let results = parse_results(&body).map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("malformed search response: {err}"))
            })?;
            debug!("{} search results", results.len());
            serde_json::to_string(&results).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use steward_core::tool::ErrorKind;

    use super::*;

    #[test]
    fn test_parse_results() {
        let body = r#"{
            "query": "weather in sf",
            "answer": null,
            "results": [
                {
                    "title": "Weather in San Francisco",
                    "url": "https://example.com/sf",
                    "content": "Sunny, 18C",
                    "score": 0.97,
                    "raw_content": null
                },
                {
                    "title": "Forecast",
                    "url": "https://example.com/forecast",
                    "content": "Fog later"
                }
            ],
            "response_time": 1.2
        }"#;
        let results = parse_results(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Weather in San Francisco");
        assert_eq!(results[0].score, 0.97);
        assert_eq!(results[1].score, 0.0);

        let output = serde_json::to_value(&results).unwrap();
        assert_eq!(output[1]["url"], "https://example.com/forecast");
        assert!(output[0].get("raw_content").is_none());
    }

    #[test]
    fn test_parse_results_without_hits() {
        assert!(parse_results(r#"{"query": "x"}"#).unwrap().is_empty());
        assert!(parse_results("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let tool = WebSearchTool::new(Some(String::new()));
        let err = tool
            .execute(WebSearchParameters {
                input: "rust".to_owned(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
        assert_eq!(err.reason(), "TAVILY_API_KEY is not set");
    }
}
