//! Provisioning API client
//!
//! Issues read calls as `POST {endpoint}/{service}/{action}` and maps
//! failures onto the resolution error taxonomy.

use super::auth::Credentials;
use super::http::{format_api_error, ApiHttpClient, ApiStatus};
use crate::engine::{ReadCall, ReadClient};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

/// Main provisioning API client
#[derive(Clone)]
pub struct ProvisioningClient {
    pub credentials: Credentials,
    pub http: ApiHttpClient,
    pub endpoint: Url,
    pub region: String,
}

impl ProvisioningClient {
    pub fn new(endpoint: &str, region: &str, credentials: Credentials) -> anyhow::Result<Self> {
        let mut endpoint = Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid endpoint '{}': {}", endpoint, e))?;
        // Url::join drops the last segment unless the path ends with '/'
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            credentials,
            http: ApiHttpClient::new()?,
            endpoint,
            region: region.to_string(),
        })
    }

    /// URL for a service action
    pub fn call_url(&self, service: &str, action: &str) -> anyhow::Result<Url> {
        let url = self
            .endpoint
            .join(&format!("{}/{}", service.to_lowercase(), action))?;
        Ok(url)
    }
}

#[async_trait]
impl ReadClient for ProvisioningClient {
    async fn read(&self, call: &ReadCall) -> Result<Value> {
        let url = self
            .call_url(&call.service, &call.action)
            .map_err(|e| Error::resolution(call.query.as_str(), e.to_string()))?;

        let body = json!({
            "parameters": call.parameters,
            "physicalResourceId": call.physical_id,
            "region": self.region,
        });

        tracing::info!("read {} for {}", call.operation(), call.query);

        self.http
            .post(
                url.as_str(),
                self.credentials.token(),
                &call.request_id.to_string(),
                &body,
            )
            .await
            .map_err(|e| {
                let message = format_api_error(&e);
                match e.downcast_ref::<ApiStatus>() {
                    Some(status) if status.is_auth_failure() => {
                        Error::permission(call.query.as_str(), message)
                    }
                    _ => Error::resolution(call.query.as_str(), message),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_url_keeps_base_path() {
        let creds = Credentials::from_token("t").unwrap();
        let client = ProvisioningClient::new("https://api.example.com/v1", "us-east-1", creds).unwrap();
        let url = client.call_url("EC2", "describeNetworkInterfaces").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/ec2/describeNetworkInterfaces");
    }

    #[test]
    fn test_invalid_endpoint() {
        let creds = Credentials::from_token("t").unwrap();
        assert!(ProvisioningClient::new("not a url", "us-east-1", creds).is_err());
    }
}
