//! Provisioning API credentials
//!
//! A bearer token taken from the command line, the `STACKBIND_TOKEN`
//! environment variable, or a `token` file next to the config.

use anyhow::{Context, Result};
use std::path::PathBuf;

pub const TOKEN_ENV: &str = "STACKBIND_TOKEN";

/// Bearer token holder
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}

impl Credentials {
    pub fn from_token(token: &str) -> Result<Self> {
        let token = token.trim();
        if !validate_token(token) {
            anyhow::bail!("API token is empty or contains invalid characters");
        }
        Ok(Self {
            token: token.to_string(),
        })
    }

    /// Resolve credentials (explicit > environment > token file)
    pub fn discover(explicit: Option<&str>) -> Result<Self> {
        if let Some(token) = explicit {
            return Self::from_token(token);
        }

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            tracing::debug!("Using API token from {}", TOKEN_ENV);
            return Self::from_token(&token);
        }

        let path = token_file_path().context("No config directory for the token file")?;
        let token = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "No API token configured. Set {} or write one to {}",
                TOKEN_ENV,
                path.display()
            )
        })?;
        tracing::debug!("Using API token from {}", path.display());
        Self::from_token(&token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

fn token_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stackbind").join("token"))
}

/// Tokens are printable ASCII with no whitespace
fn validate_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_graphic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_validation() {
        assert!(Credentials::from_token("  abc.DEF-123  ").is_ok());
        assert!(Credentials::from_token("").is_err());
        assert!(Credentials::from_token("has space").is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::from_token("secret-token").unwrap();
        assert!(!format!("{:?}", creds).contains("secret-token"));
        assert_eq!(creds.token(), "secret-token");
    }
}
