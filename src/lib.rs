//! stackbind - declarative cloud resource graphs with deploy-time
//! attribute resolution
//!
//! # Module Structure
//!
//! - [`graph`] - Resources, property values and dependency ordering
//! - [`resolver`] - Read queries producing deferred values
//! - [`engine`] - Executor running read queries and materialising values
//! - [`cloud`] - Provisioning API client
//! - [`stack`] - The private container service stack
//! - [`config`] - Persistent user configuration
//! - [`error`] - Error taxonomy

pub mod cloud;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod resolver;
pub mod stack;

pub use engine::{Executor, Outputs, ReadClient, Resolutions, StaticReadClient};
pub use error::{Error, ErrorKind, Result};
pub use graph::{DeferredValue, Prop, Resource, ResourceGraph, ResourceId, ResourceKind, Step};
pub use resolver::{eni_ip_lookup, eni_ip_resolver, AttributeResolver, FieldPath, ReadQuery};
