//! HTTP utilities for provisioning API calls

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::fmt;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Non-success HTTP status from the provisioning API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStatus {
    pub status: u16,
    /// Sanitized, truncated response body
    pub body: String,
}

impl ApiStatus {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: sanitize_for_log(body.trim()),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API request failed: {}", self.status)
    }
}

impl std::error::Error for ApiStatus {}

/// HTTP client wrapper for provisioning API calls
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
}

impl ApiHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("stackbind/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// POST a JSON body and parse the JSON response
    pub async fn post(
        &self,
        url: &str,
        token: &str,
        request_id: &str,
        body: &Value,
    ) -> Result<Value> {
        tracing::debug!("POST {} (request {})", url, request_id);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("x-request-id", request_id)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only log sanitized/truncated error body
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(ApiStatus::new(status.as_u16(), &response_body).into());
        }

        if response_body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_body).context("Failed to parse response JSON")
    }
}

/// Format a provisioning API error for display
pub fn format_api_error(error: &anyhow::Error) -> String {
    if let Some(status) = error.downcast_ref::<ApiStatus>() {
        let summary = match status.status {
            401 => "Authentication failed. Check the configured API token.".to_string(),
            403 => "Permission denied. The lookup policy does not allow this action.".to_string(),
            404 => "Target resource not found.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => "Invalid request. Check the call parameters.".to_string(),
            409 => "Resource conflict.".to_string(),
            500..=599 => "Provisioning API temporarily unavailable.".to_string(),
            other => format!("Request failed with status {}.", other),
        };
        if status.body.is_empty() {
            return summary;
        }
        return format!("{} Server said: {}", summary, status.body);
    }

    // Truncate long error messages and remove potential sensitive data
    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
        assert_eq!(sanitize_for_log("a\nb"), "ab");
    }

    #[test]
    fn test_format_api_error_by_status() {
        let err: anyhow::Error = ApiStatus::new(403, "").into();
        assert_eq!(
            format_api_error(&err),
            "Permission denied. The lookup policy does not allow this action."
        );
        let err: anyhow::Error = ApiStatus::new(503, "").into();
        assert!(format_api_error(&err).contains("unavailable"));
        let err = anyhow::anyhow!("connection refused");
        assert_eq!(format_api_error(&err), "connection refused");
    }

    #[test]
    fn test_format_api_error_keeps_server_message() {
        let err: anyhow::Error =
            ApiStatus::new(400, "{\"message\":\"The networkInterface ID 'eni-gone' does not exist\"}\n")
                .into();
        let message = format_api_error(&err);
        assert!(message.starts_with("Invalid request."));
        assert!(message.contains("The networkInterface ID 'eni-gone' does not exist"));
    }
}
