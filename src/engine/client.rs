//! Read clients
//!
//! The executor talks to infrastructure through [`ReadClient`]. The HTTP
//! implementation lives in [`crate::cloud`]; [`StaticReadClient`] serves
//! canned responses for dry runs and tests.

use crate::error::{Error, Result};
use crate::graph::ResourceId;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// A read call with every parameter resolved
#[derive(Debug, Clone)]
pub struct ReadCall {
    /// Logical identity of the query, for error reporting
    pub query: ResourceId,
    pub service: String,
    pub action: String,
    pub parameters: Value,
    pub physical_id: String,
    pub request_id: Uuid,
}

impl ReadCall {
    /// `service.action`, the key used for canned responses
    pub fn operation(&self) -> String {
        format!("{}.{}", self.service, self.action)
    }
}

/// Issues read-only calls against provisioned infrastructure
#[async_trait]
pub trait ReadClient: Send + Sync {
    async fn read(&self, call: &ReadCall) -> Result<Value>;
}

#[async_trait]
impl<T: ReadClient + ?Sized> ReadClient for std::sync::Arc<T> {
    async fn read(&self, call: &ReadCall) -> Result<Value> {
        (**self).read(call).await
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Response(Value),
    Denied(String),
    Failed(String),
    Stall(Duration),
}

/// Serves fixed responses keyed by `service.action`
#[derive(Debug, Default)]
pub struct StaticReadClient {
    responses: HashMap<String, Canned>,
    calls: AtomicUsize,
}

impl StaticReadClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load responses from a JSON object of `{"Service.action": response}`
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::construction(
                "canned responses must be a JSON object keyed by service.action",
            ));
        };
        let mut client = Self::new();
        for (operation, response) in map {
            client.responses.insert(operation, Canned::Response(response));
        }
        Ok(client)
    }

    pub fn respond(mut self, service: &str, action: &str, response: Value) -> Self {
        self.responses
            .insert(format!("{}.{}", service, action), Canned::Response(response));
        self
    }

    pub fn deny(mut self, service: &str, action: &str, message: &str) -> Self {
        self.responses.insert(
            format!("{}.{}", service, action),
            Canned::Denied(message.to_string()),
        );
        self
    }

    pub fn fail(mut self, service: &str, action: &str, message: &str) -> Self {
        self.responses.insert(
            format!("{}.{}", service, action),
            Canned::Failed(message.to_string()),
        );
        self
    }

    /// Never answer within `delay`
    pub fn stall(mut self, service: &str, action: &str, delay: Duration) -> Self {
        self.responses
            .insert(format!("{}.{}", service, action), Canned::Stall(delay));
        self
    }

    /// Number of calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadClient for StaticReadClient {
    async fn read(&self, call: &ReadCall) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let operation = call.operation();
        tracing::debug!("static read {} for {}", operation, call.query);

        match self.responses.get(&operation) {
            Some(Canned::Response(response)) => Ok(response.clone()),
            Some(Canned::Denied(message)) => Err(Error::permission(call.query.as_str(), message)),
            Some(Canned::Failed(message)) => Err(Error::resolution(call.query.as_str(), message)),
            Some(Canned::Stall(delay)) => {
                tokio::time::sleep(*delay).await;
                Err(Error::resolution(call.query.as_str(), "stalled call returned late"))
            }
            None => Err(Error::resolution(
                call.query.as_str(),
                format!("no response configured for {}", operation),
            )),
        }
    }
}
