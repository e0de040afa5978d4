//! Deploy-time state: provisioned outputs and resolved values

use crate::error::{Error, Result};
use crate::graph::{DeferredValue, Prop, Resource, ResourceId};
use crate::resolver::FieldPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Output attributes of resources the orchestration engine has provisioned
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outputs(BTreeMap<String, BTreeMap<String, Value>>);

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: &str, attribute: &str, value: Value) -> Self {
        self.set(resource, attribute, value);
        self
    }

    pub fn set(&mut self, resource: &str, attribute: &str, value: Value) {
        self.0
            .entry(resource.to_string())
            .or_default()
            .insert(attribute.to_string(), value);
    }

    pub fn get(&self, resource: &ResourceId, attribute: &str) -> Option<&Value> {
        self.0.get(resource.as_str()).and_then(|attrs| attrs.get(attribute))
    }
}

/// Values produced by one read query, in declared path order
#[derive(Debug, Clone)]
pub struct ResolvedBatch {
    pub query: ResourceId,
    pub values: Vec<(FieldPath, String)>,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedBatch {
    pub fn scalars(&self) -> Vec<&str> {
        self.values.iter().map(|(_, v)| v.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Pending,
    Resolved(String),
}

/// Resolution table keyed by query and field path
#[derive(Debug, Clone, Default)]
pub struct Resolutions {
    slots: HashMap<ResourceId, HashMap<FieldPath, Slot>>,
}

impl Resolutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the paths of a query as pending
    pub(crate) fn declare(&mut self, query: &ResourceId, paths: &[FieldPath]) {
        let slots = self.slots.entry(query.clone()).or_default();
        for path in paths {
            slots.entry(path.clone()).or_insert(Slot::Pending);
        }
    }

    /// Commit a whole batch at once
    pub(crate) fn commit(&mut self, batch: &ResolvedBatch) {
        let slots = self.slots.entry(batch.query.clone()).or_default();
        for (path, value) in &batch.values {
            slots.insert(path.clone(), Slot::Resolved(value.clone()));
        }
    }

    pub fn get(&self, value: &DeferredValue) -> Option<&str> {
        match self.slots.get(value.query())?.get(value.path())? {
            Slot::Resolved(v) => Some(v.as_str()),
            Slot::Pending => None,
        }
    }

    /// Number of resolved values
    pub fn len(&self) -> usize {
        self.slots
            .values()
            .flat_map(|slots| slots.values())
            .filter(|slot| matches!(slot, Slot::Resolved(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolved values as `{query: {path: value}}`, sorted
    pub fn to_json(&self) -> Value {
        let mut out: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
        for (query, slots) in &self.slots {
            let values = out.entry(query.to_string()).or_default();
            for (path, slot) in slots {
                if let Slot::Resolved(v) = slot {
                    values.insert(path.to_string(), Value::String(v.clone()));
                }
            }
        }
        serde_json::to_value(out).unwrap_or(Value::Null)
    }

    /// Substitute every reference and deferred value in `prop`
    pub fn materialize(&self, prop: &Prop, outputs: &Outputs) -> Result<Value> {
        Ok(match prop {
            Prop::Null => Value::Null,
            Prop::Bool(b) => Value::Bool(*b),
            Prop::Number(n) => Value::Number(n.clone()),
            Prop::String(s) => Value::String(s.clone()),
            Prop::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.materialize(item, outputs))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Prop::Map(map) => {
                let mut object = Map::new();
                for (k, v) in map {
                    object.insert(k.clone(), self.materialize(v, outputs)?);
                }
                Value::Object(object)
            }
            Prop::Ref(r) => outputs
                .get(&r.resource, &r.attribute)
                .cloned()
                .ok_or_else(|| Error::Unresolved(format!("{} is not provisioned", r)))?,
            Prop::Select { index, list } => {
                let items = outputs
                    .get(&list.resource, &list.attribute)
                    .ok_or_else(|| Error::Unresolved(format!("{} is not provisioned", list)))?;
                items
                    .as_array()
                    .and_then(|items| items.get(*index))
                    .cloned()
                    .ok_or_else(|| {
                        Error::Unresolved(format!("{} has no element {}", list, index))
                    })?
            }
            Prop::Deferred(d) => self
                .get(d)
                .map(|v| Value::String(v.to_string()))
                .ok_or_else(|| Error::Unresolved(format!("{} has not been resolved", d)))?,
            Prop::Join(parts) => {
                let mut joined = String::new();
                for part in parts {
                    match self.materialize(part, outputs)? {
                        Value::String(s) => joined.push_str(&s),
                        Value::Number(n) => joined.push_str(&n.to_string()),
                        Value::Bool(b) => joined.push_str(&b.to_string()),
                        other => {
                            return Err(Error::Unresolved(format!(
                                "cannot join non-scalar value {}",
                                other
                            )))
                        }
                    }
                }
                Value::String(joined)
            }
        })
    }

    /// Concrete properties for a resource; fails if any input is missing
    pub fn materialize_resource(&self, resource: &Resource, outputs: &Outputs) -> Result<Value> {
        let mut object = Map::new();
        for (k, v) in &resource.properties {
            object.insert(k.clone(), self.materialize(v, outputs)?);
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    #[test]
    fn test_pending_until_committed() {
        let query = ResourceId::new("Lookup");
        let value = DeferredValue::new(query.clone(), path("A.0.B"));
        let mut table = Resolutions::new();
        table.declare(&query, &[path("A.0.B")]);
        assert_eq!(table.get(&value), None);
        assert!(table.is_empty());

        table.commit(&ResolvedBatch {
            query: query.clone(),
            values: vec![(path("A.0.B"), "10.0.1.5".to_string())],
            resolved_at: Utc::now(),
        });
        assert_eq!(table.get(&value), Some("10.0.1.5"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.to_json(), json!({ "Lookup": { "A.0.B": "10.0.1.5" } }));
    }

    #[test]
    fn test_materialize_select_and_join() {
        let endpoint = ResourceId::new("Endpoint");
        let ingress = ResourceId::new("Ingress");
        let outputs = Outputs::new()
            .with("Endpoint", "NetworkInterfaceIds", json!(["eni-1", "eni-2"]))
            .with("Ingress", "DomainName", json!("abc.awsapprunner.com"));

        let table = Resolutions::new();
        let select = endpoint.select(1, "NetworkInterfaceIds");
        assert_eq!(table.materialize(&select, &outputs).unwrap(), json!("eni-2"));

        let uri = Prop::Join(vec![
            Prop::from("https://"),
            ingress.attr("DomainName").into(),
            Prop::from("/{proxy}"),
        ]);
        assert_eq!(
            table.materialize(&uri, &outputs).unwrap(),
            json!("https://abc.awsapprunner.com/{proxy}")
        );

        let out_of_range = endpoint.select(2, "NetworkInterfaceIds");
        assert!(matches!(
            table.materialize(&out_of_range, &outputs),
            Err(Error::Unresolved(_))
        ));
    }

    #[test]
    fn test_join_rejects_null_and_structured_parts() {
        let ingress = ResourceId::new("Ingress");
        let uri = Prop::Join(vec![
            Prop::from("https://"),
            ingress.attr("DomainName").into(),
            Prop::from(":"),
            ingress.attr("Port").into(),
        ]);

        let outputs = Outputs::new()
            .with("Ingress", "DomainName", json!("abc.awsapprunner.com"))
            .with("Ingress", "Port", json!(443));
        assert_eq!(
            Resolutions::new().materialize(&uri, &outputs).unwrap(),
            json!("https://abc.awsapprunner.com:443")
        );

        for bad in [json!(null), json!(["a"]), json!({ "a": 1 })] {
            let outputs = Outputs::new()
                .with("Ingress", "DomainName", bad)
                .with("Ingress", "Port", json!(443));
            assert!(matches!(
                Resolutions::new().materialize(&uri, &outputs),
                Err(Error::Unresolved(_))
            ));
        }
    }

    #[test]
    fn test_unresolved_deferred_is_an_error() {
        let value = DeferredValue::new(ResourceId::new("Lookup"), path("A.0.B"));
        let err = Resolutions::new()
            .materialize(&Prop::Deferred(value), &Outputs::new())
            .unwrap_err();
        assert!(matches!(err, Error::Unresolved(msg) if msg.contains("Lookup[A.0.B]")));
    }
}
