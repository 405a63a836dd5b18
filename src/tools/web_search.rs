//! Web Search Tool
//!
//! Server-executed `web_search` tool backed by the Tavily search API. Any
//! failure degrades to an empty result list with a logged error; the model
//! simply sees no results.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use ponder_core::ToolDefinition;

pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// The `web_search` tool definition surfaced to the model.
pub fn web_search_tool() -> ToolDefinition {
    ToolDefinition::new(
        WEB_SEARCH_TOOL_NAME,
        "Search the web for real-time information: industry-standard terms \
         and naming, how comparable sites structure their content, or \
         verification of product names the user mentions. The search runs \
         automatically and its results are returned to you.",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        }),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Execute one web search; returns the tool-result payload.
pub async fn run_web_search(client: &reqwest::Client, api_key: &str, query: &str) -> Value {
    search_tavily(client, TAVILY_SEARCH_URL, api_key, query).await
}

async fn search_tavily(client: &reqwest::Client, url: &str, api_key: &str, query: &str) -> Value {
    let empty = json!({"results": []});

    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(&json!({
            "api_key": api_key,
            "query": query,
            "search_depth": "basic",
            "max_results": 5,
        }))
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "web search request failed");
            return empty;
        }
    };

    if !response.status().is_success() {
        tracing::error!(status = response.status().as_u16(), "web search API error");
        return empty;
    }

    match response.json::<TavilyResponse>().await {
        Ok(parsed) => json!({"results": parsed.results}),
        Err(e) => {
            tracing::error!(error = %e, "web search response parse failed");
            empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_tool_definition() {
        let tool = web_search_tool();
        assert_eq!(tool.name, WEB_SEARCH_TOOL_NAME);
        assert_eq!(tool.input_schema["required"][0], "query");
    }

    #[tokio::test]
    async fn test_search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(
                json!({"query": "rust sse", "search_depth": "basic", "max_results": 5}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"title": "SSE in Rust", "url": "https://example.com", "content": "summary", "score": 0.9}
                ]
            })))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let value = search_tavily(&client, &server.uri(), "tvly-test", "rust sse").await;
        assert_eq!(value["results"][0]["title"], "SSE in Rust");
        assert!(value["results"][0].get("score").is_none());
    }

    #[tokio::test]
    async fn test_search_degrades_to_empty_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let value = search_tavily(&client, &server.uri(), "tvly-test", "anything").await;
        assert_eq!(value, json!({"results": []}));
    }
}
