use crate::capability::traits::{required_str, string_params_schema, Capability, CapabilityResult};
use crate::constants::{defaults, endpoints};
use crate::error::EnsembleError;
use serde_json::Value;
use std::time::Duration;

fn http_client(capability: &str, timeout: Duration) -> Result<reqwest::Client, EnsembleError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(defaults::USER_AGENT)
        .build()
        .map_err(|e| EnsembleError::execution(capability, format!("HTTP client error: {e}")))
}

/// Web search through the Serper API. Returns one snippet per line.
pub struct WebSearchTool {
    api_key_env: String,
    endpoint: String,
    timeout: Duration,
}

impl WebSearchTool {
    pub fn new(api_key_env: impl Into<String>) -> Self {
        Self {
            api_key_env: api_key_env.into(),
            endpoint: endpoints::SERPER_SEARCH_URL.to_string(),
            timeout: Duration::from_secs(defaults::CALL_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl Capability for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information."
    }

    fn parameters_schema(&self) -> Value {
        string_params_schema(&[("query", "The search query")], &["query"])
    }

    async fn invoke(&self, args: Value) -> CapabilityResult {
        let query = required_str(&args, self.name(), "query")?;

        let api_key = std::env::var(&self.api_key_env).map_err(|_| {
            EnsembleError::execution(self.name(), format!("{} is not set", self.api_key_env))
        })?;

        let client = http_client(self.name(), self.timeout)?;
        let response = client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await
            .map_err(|e| EnsembleError::execution(self.name(), format!("Search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(format!("[Error fetching search results: {}]", status.as_u16()));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| EnsembleError::execution(self.name(), format!("Failed to read response: {e}")))?;

        Ok(collect_snippets(&data))
    }
}

/// Snippet (or title when the snippet is missing) of every organic result.
pub fn collect_snippets(data: &Value) -> String {
    data.get("organic")
        .and_then(|o| o.as_array())
        .map(|results| {
            results
                .iter()
                .filter_map(|r| {
                    r.get("snippet")
                        .or_else(|| r.get("title"))
                        .and_then(|s| s.as_str())
                        .filter(|s| !s.is_empty())
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Page summary from the Wikipedia REST API.
pub struct WikipediaSearchTool {
    base_url: String,
    timeout: Duration,
}

impl WikipediaSearchTool {
    pub fn new() -> Self {
        Self {
            base_url: endpoints::WIKIPEDIA_SUMMARY_URL.to_string(),
            timeout: Duration::from_secs(defaults::CALL_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Default for WikipediaSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Capability for WikipediaSearchTool {
    fn name(&self) -> &str {
        "wikipedia_search"
    }

    fn description(&self) -> &str {
        "Search Wikipedia for a summary."
    }

    fn parameters_schema(&self) -> Value {
        string_params_schema(&[("query", "Article title to look up")], &["query"])
    }

    async fn invoke(&self, args: Value) -> CapabilityResult {
        let query = required_str(&args, self.name(), "query")?;
        let title = urlencoding::encode(&query.trim().replace(' ', "_")).into_owned();
        let url = format!("{}/{}", self.base_url, title);

        let client = http_client(self.name(), self.timeout)?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| EnsembleError::execution(self.name(), format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(format!("[Wikipedia error: {}]", status.as_u16()));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| EnsembleError::execution(self.name(), format!("Failed to read response: {e}")))?;

        Ok(data
            .get("extract")
            .and_then(|e| e.as_str())
            .unwrap_or("No summary found.")
            .to_string())
    }
}
