use crate::capability::traits::{required_str, string_params_schema, Capability, CapabilityResult};
use crate::constants::defaults;
use crate::error::EnsembleError;
use serde_json::Value;
use std::time::Duration;

pub struct UrlReaderTool {
    max_chars: usize,
    timeout: Duration,
}

impl UrlReaderTool {
    pub fn new(max_chars: usize, timeout: Duration) -> Self {
        Self { max_chars, timeout }
    }
}

impl Default for UrlReaderTool {
    fn default() -> Self {
        Self::new(
            defaults::URL_MAX_CHARS,
            Duration::from_secs(defaults::URL_TIMEOUT_SECS),
        )
    }
}

#[async_trait::async_trait]
impl Capability for UrlReaderTool {
    fn name(&self) -> &str {
        "url_reader"
    }

    fn description(&self) -> &str {
        "Read and return the content of a URL (first 2000 chars)."
    }

    fn parameters_schema(&self) -> Value {
        string_params_schema(&[("url", "The URL to fetch")], &["url"])
    }

    async fn invoke(&self, args: Value) -> CapabilityResult {
        let url = required_str(&args, self.name(), "url")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EnsembleError::execution(
                self.name(),
                format!("Unsupported URL scheme: {url}"),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(defaults::USER_AGENT)
            .build()
            .map_err(|e| EnsembleError::execution(self.name(), format!("HTTP client error: {e}")))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| EnsembleError::execution(self.name(), format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(format!("[URL error: {}]", status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EnsembleError::execution(self.name(), format!("Failed to read response: {e}")))?;

        Ok(truncate_chars(&body, self.max_chars))
    }
}

/// First `max_chars` characters, with `...` appended when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }

    #[tokio::test]
    async fn non_http_schemes_are_rejected() {
        let err = UrlReaderTool::default()
            .invoke(serde_json::json!({"url": "file:///etc/passwd"}))
            .await
            .unwrap_err();
        assert!(matches!(err, EnsembleError::CapabilityExecution { .. }));
    }
}
