//! Resolution executor
//!
//! Runs each registered read query once, after the resources its targets
//! come from have been provisioned, and before anything consuming its
//! deferred values is materialised. Provisioning itself belongs to the
//! orchestration engine; its results arrive here as [`Outputs`].
//!
//! # Module Structure
//!
//! - [`client`] - The read client seam and a canned-response client
//! - [`state`] - Provisioned outputs and the resolution table

pub mod client;
pub mod state;

pub use client::{ReadCall, ReadClient, StaticReadClient};
pub use state::{Outputs, ResolvedBatch, Resolutions};

use crate::error::{Error, Result};
use crate::graph::{ResourceGraph, Step};
use crate::resolver::{FieldPath, PathError, ReadQuery};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Explicit resolution step over a [`ReadClient`]
pub struct Executor<C> {
    client: C,
}

impl<C: ReadClient> Executor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Run one query and extract every declared path.
    ///
    /// Either all paths resolve or none do.
    pub async fn resolve(
        &self,
        query: &ReadQuery,
        outputs: &Outputs,
        resolved: &Resolutions,
    ) -> Result<ResolvedBatch> {
        if query.is_noop() {
            tracing::debug!("resolver {} has no targets, skipping call", query.id());
            return Ok(ResolvedBatch {
                query: query.id().clone(),
                values: Vec::new(),
                resolved_at: Utc::now(),
            });
        }

        let parameters = resolved.materialize(&query.parameters(), outputs)?;
        let call = ReadCall {
            query: query.id().clone(),
            service: query.service().to_string(),
            action: query.action().to_string(),
            parameters,
            physical_id: query.physical_id().to_string(),
            request_id: Uuid::new_v4(),
        };

        tracing::info!(
            "resolving {} via {} ({} paths, request {})",
            query.id(),
            call.operation(),
            query.paths().len(),
            call.request_id
        );

        let response = match tokio::time::timeout(query.timeout(), self.client.read(&call)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!("resolver {} timed out", query.id());
                return Err(Error::Timeout {
                    query: query.id().to_string(),
                    timeout: query.timeout(),
                });
            }
        };

        let values = extract_all(query, &response)?;
        Ok(ResolvedBatch {
            query: query.id().clone(),
            values,
            resolved_at: Utc::now(),
        })
    }

    /// Resolve every query of the graph in dependency order.
    ///
    /// The first failure aborts; the partial table is dropped with it.
    pub async fn resolve_all(&self, graph: &ResourceGraph, outputs: &Outputs) -> Result<Resolutions> {
        let mut resolved = Resolutions::new();
        for query in graph.queries() {
            resolved.declare(query.id(), query.paths());
        }

        for step in graph.plan()? {
            let Step::Resolve(id) = step else {
                continue;
            };
            let Some(query) = graph.query(&id) else {
                return Err(Error::UnknownResource(id.to_string()));
            };
            let batch = self.resolve(query, outputs, &resolved).await?;
            tracing::info!("resolved {} values for {}", batch.values.len(), id);
            tracing::debug!("{} -> {:?}", id, batch.scalars());
            resolved.commit(&batch);
        }

        Ok(resolved)
    }
}

fn extract_all(query: &ReadQuery, response: &Value) -> Result<Vec<(FieldPath, String)>> {
    let mut values = Vec::with_capacity(query.paths().len());
    for path in query.paths() {
        match path.extract(response) {
            Ok(value) => values.push((path.clone(), value)),
            Err(PathError::Missing) => {
                tracing::error!("{}: field {} missing from response", query.id(), path);
                return Err(Error::MissingField {
                    query: query.id().to_string(),
                    path: path.to_string(),
                });
            }
            Err(PathError::NotScalar) => {
                return Err(Error::resolution(
                    query.id().as_str(),
                    format!("field '{}' is not a scalar", path),
                ));
            }
        }
    }
    Ok(values)
}
