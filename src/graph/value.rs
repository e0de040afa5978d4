//! Property values
//!
//! A [`Prop`] is either a literal or a reference to something that only
//! exists once part of the graph has been provisioned or resolved.

use crate::resolver::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Stable logical identifier of a resource in the graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reference an output attribute of this resource
    pub fn attr(&self, attribute: &str) -> AttrRef {
        AttrRef {
            resource: self.clone(),
            attribute: attribute.to_string(),
        }
    }

    /// Select element `index` of a list-valued output attribute
    pub fn select(&self, index: usize, attribute: &str) -> Prop {
        Prop::Select {
            index,
            list: self.attr(attribute),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Output attribute of another resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrRef {
    pub resource: ResourceId,
    pub attribute: String,
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// Placeholder for a field of a read query's response.
///
/// Holds only the query identity and the field path. The resolved scalar is
/// never reachable through this handle; it lives in the executor's
/// resolution table once the query has run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeferredValue {
    query: ResourceId,
    path: FieldPath,
}

impl DeferredValue {
    pub(crate) fn new(query: ResourceId, path: FieldPath) -> Self {
        Self { query, path }
    }

    pub fn query(&self) -> &ResourceId {
        &self.query
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }
}

impl fmt::Display for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.query, self.path)
    }
}

/// Resource property value
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Prop>),
    Map(BTreeMap<String, Prop>),
    /// Output attribute of another resource
    Ref(AttrRef),
    /// Element of a list-valued output attribute
    Select { index: usize, list: AttrRef },
    /// Field of a read query's response
    Deferred(DeferredValue),
    /// String concatenation
    Join(Vec<Prop>),
}

impl Prop {
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Prop)>,
    {
        Prop::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Prop>,
    {
        Prop::List(items.into_iter().map(Into::into).collect())
    }

    /// True if nothing in this value waits on provisioning or resolution
    pub fn is_concrete(&self) -> bool {
        match self {
            Prop::Ref(_) | Prop::Select { .. } | Prop::Deferred(_) => false,
            Prop::List(items) | Prop::Join(items) => items.iter().all(Prop::is_concrete),
            Prop::Map(map) => map.values().all(Prop::is_concrete),
            _ => true,
        }
    }

    /// Visit every attribute reference (including `Select` lists)
    pub fn for_each_ref<'a>(&'a self, f: &mut impl FnMut(&'a AttrRef)) {
        match self {
            Prop::Ref(r) | Prop::Select { list: r, .. } => f(r),
            Prop::List(items) | Prop::Join(items) => {
                for item in items {
                    item.for_each_ref(f);
                }
            }
            Prop::Map(map) => {
                for v in map.values() {
                    v.for_each_ref(f);
                }
            }
            _ => {}
        }
    }

    /// Visit every deferred value
    pub fn for_each_deferred<'a>(&'a self, f: &mut impl FnMut(&'a DeferredValue)) {
        match self {
            Prop::Deferred(d) => f(d),
            Prop::List(items) | Prop::Join(items) => {
                for item in items {
                    item.for_each_deferred(f);
                }
            }
            Prop::Map(map) => {
                for v in map.values() {
                    v.for_each_deferred(f);
                }
            }
            _ => {}
        }
    }

    /// Render as a CloudFormation-style template fragment
    pub fn to_template(&self) -> Value {
        match self {
            Prop::Null => Value::Null,
            Prop::Bool(b) => Value::Bool(*b),
            Prop::Number(n) => Value::Number(n.clone()),
            Prop::String(s) => Value::String(s.clone()),
            Prop::List(items) => Value::Array(items.iter().map(Prop::to_template).collect()),
            Prop::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_template()))
                    .collect(),
            ),
            Prop::Ref(r) => get_att(r.resource.as_str(), &r.attribute),
            Prop::Select { index, list } => {
                json!({ "Fn::Select": [index, get_att(list.resource.as_str(), &list.attribute)] })
            }
            Prop::Deferred(d) => get_att(d.query.as_str(), d.path.as_str()),
            Prop::Join(parts) => {
                let parts: Vec<Value> = parts.iter().map(Prop::to_template).collect();
                json!({ "Fn::Join": ["", parts] })
            }
        }
    }
}

fn get_att(resource: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [resource, attribute] })
}

impl From<&str> for Prop {
    fn from(s: &str) -> Self {
        Prop::String(s.to_string())
    }
}

impl From<String> for Prop {
    fn from(s: String) -> Self {
        Prop::String(s)
    }
}

impl From<bool> for Prop {
    fn from(b: bool) -> Self {
        Prop::Bool(b)
    }
}

impl From<u16> for Prop {
    fn from(n: u16) -> Self {
        Prop::Number(n.into())
    }
}

impl From<u32> for Prop {
    fn from(n: u32) -> Self {
        Prop::Number(n.into())
    }
}

impl From<AttrRef> for Prop {
    fn from(r: AttrRef) -> Self {
        Prop::Ref(r)
    }
}

impl From<DeferredValue> for Prop {
    fn from(d: DeferredValue) -> Self {
        Prop::Deferred(d)
    }
}

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Prop::Null,
            Value::Bool(b) => Prop::Bool(b),
            Value::Number(n) => Prop::Number(n),
            Value::String(s) => Prop::String(s),
            Value::Array(items) => Prop::List(items.into_iter().map(Prop::from).collect()),
            Value::Object(map) => Prop::Map(map.into_iter().map(|(k, v)| (k, Prop::from(v))).collect()),
        }
    }
}

impl From<Vec<Prop>> for Prop {
    fn from(items: Vec<Prop>) -> Self {
        Prop::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_renders_get_att() {
        let endpoint = ResourceId::new("Endpoint");
        let prop = endpoint.select(1, "NetworkInterfaceIds");
        assert_eq!(
            prop.to_template(),
            json!({ "Fn::Select": [1, { "Fn::GetAtt": ["Endpoint", "NetworkInterfaceIds"] }] })
        );
        assert!(!prop.is_concrete());
    }

    #[test]
    fn test_refs_are_collected_from_nested_values() {
        let a = ResourceId::new("A");
        let b = ResourceId::new("B");
        let prop = Prop::map([
            ("x", Prop::from(a.attr("Id"))),
            ("y", Prop::list(vec![Prop::from("lit"), b.select(0, "Ids")])),
            ("z", Prop::Join(vec![Prop::from("https://"), a.attr("Domain").into()])),
        ]);

        let mut seen = Vec::new();
        prop.for_each_ref(&mut |r| seen.push(r.to_string()));
        seen.sort();
        assert_eq!(seen, vec!["A.Domain", "A.Id", "B.Ids"]);
    }

    #[test]
    fn test_literals_are_concrete() {
        let prop = Prop::map([("port", Prop::from(443u16)), ("name", Prop::from("tg"))]);
        assert!(prop.is_concrete());
        assert_eq!(prop.to_template(), json!({ "name": "tg", "port": 443 }));
    }
}
