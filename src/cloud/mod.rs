//! Provisioning API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer token discovery
//! - [`client`] - The [`crate::engine::ReadClient`] over HTTP
//! - [`http`] - HTTP utilities for REST calls
//!
//! # Example
//!
//! ```ignore
//! use stackbind::cloud::{auth::Credentials, client::ProvisioningClient};
//!
//! let creds = Credentials::discover(None)?;
//! let client = ProvisioningClient::new("https://provisioning.internal/v1", "us-east-1", creds)?;
//! let executor = Executor::new(client);
//! ```

pub mod auth;
pub mod client;
pub mod http;
