//! Property-based tests using proptest
//!
//! These tests check resolver construction and resolution over randomized
//! target lists and responses.

use proptest::prelude::*;
use serde_json::{json, Value};
use stackbind::resolver::FieldPathTemplate;
use stackbind::{
    eni_ip_resolver, AttributeResolver, Error, Executor, Outputs, ResourceGraph, StaticReadClient,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Generate a network interface id
fn arb_eni_id() -> impl Strategy<Value = String> {
    "eni-[0-9a-f]{8,17}"
}

/// Generate a private IPv4 address
fn arb_ip() -> impl Strategy<Value = String> {
    (0u8..=255, 0u8..=255, 1u8..=254).prop_map(|(b, c, d)| format!("10.{}.{}.{}", b, c, d))
}

/// Generate targets together with one address per target
fn arb_targets_with_ips() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    (0usize..16).prop_flat_map(|n| {
        (
            prop::collection::vec(arb_eni_id(), n),
            prop::collection::vec(arb_ip(), n),
        )
    })
}

fn describe_response(ids: &[String], ips: &[String]) -> Value {
    let interfaces: Vec<Value> = ids
        .iter()
        .zip(ips)
        .map(|(id, ip)| json!({ "NetworkInterfaceId": id, "PrivateIpAddress": ip }))
        .collect();
    json!({ "NetworkInterfaces": interfaces })
}

fn run(graph: &ResourceGraph, client: Arc<StaticReadClient>) -> stackbind::Result<stackbind::Resolutions> {
    tokio_test::block_on(Executor::new(client).resolve_all(graph, &Outputs::new()))
}

fn registered(resolver: &AttributeResolver) -> ResourceGraph {
    let mut graph = ResourceGraph::new();
    graph.add_resolver(resolver).unwrap();
    graph
}

proptest! {
    /// N targets give N values with distinct paths in order
    #[test]
    fn test_one_distinct_path_per_target(ids in prop::collection::vec(arb_eni_id(), 0..32)) {
        let resolver = eni_ip_resolver("Lookup", ids.iter().map(String::as_str)).unwrap();
        let values = resolver.get_values();

        prop_assert_eq!(values.len(), ids.len());
        let distinct: HashSet<_> = values.iter().map(|v| v.path().clone()).collect();
        prop_assert_eq!(distinct.len(), ids.len());
        for (i, value) in values.iter().enumerate() {
            let expected = format!("NetworkInterfaces.{}.PrivateIpAddress", i);
            prop_assert_eq!(value.path().as_str(), expected.as_str());
        }
    }

    /// Building twice from the same input gives the same query
    #[test]
    fn test_construction_is_idempotent(ids in prop::collection::vec(arb_eni_id(), 0..16)) {
        let a = eni_ip_resolver("Lookup", ids.iter().map(String::as_str)).unwrap();
        let b = eni_ip_resolver("Lookup", ids.iter().map(String::as_str)).unwrap();
        prop_assert_eq!(a.query(), b.query());
        prop_assert_eq!(a.get_values(), b.get_values());
    }

    /// Every value resolves to the field its path names
    #[test]
    fn test_round_trip_resolution((ids, ips) in arb_targets_with_ips()) {
        let resolver = eni_ip_resolver("Lookup", ids.iter().map(String::as_str)).unwrap();
        let graph = registered(&resolver);
        let client = Arc::new(StaticReadClient::new().respond(
            "EC2",
            "describeNetworkInterfaces",
            describe_response(&ids, &ips),
        ));

        let resolved = run(&graph, client.clone()).unwrap();
        let got: Vec<String> = resolver
            .get_values()
            .iter()
            .map(|v| resolved.get(v).unwrap().to_string())
            .collect();

        prop_assert_eq!(got, ips);
        prop_assert_eq!(client.calls(), if ids.is_empty() { 0 } else { 1 });
    }

    /// Dropping one entry from the response fails the whole batch
    #[test]
    fn test_missing_entry_resolves_nothing(
        (ids, ips) in arb_targets_with_ips().prop_filter("need targets", |(ids, _)| !ids.is_empty()),
        drop_seed in any::<prop::sample::Index>(),
    ) {
        let dropped = drop_seed.index(ids.len());
        let mut response = describe_response(&ids, &ips);
        response["NetworkInterfaces"][dropped]
            .as_object_mut()
            .unwrap()
            .remove("PrivateIpAddress");

        let resolver = eni_ip_resolver("Lookup", ids.iter().map(String::as_str)).unwrap();
        let graph = registered(&resolver);
        let client = Arc::new(StaticReadClient::new().respond("EC2", "describeNetworkInterfaces", response));

        let err = run(&graph, client).unwrap_err();
        match err {
            Error::MissingField { path, .. } => {
                prop_assert_eq!(path, format!("NetworkInterfaces.{}.PrivateIpAddress", dropped));
            }
            other => prop_assert!(false, "expected MissingField, got {:?}", other),
        }
    }

    /// Templates render the index in place of the placeholder only
    #[test]
    fn test_template_render(
        collection in "[A-Z][A-Za-z]{0,20}",
        attribute in "[A-Z][A-Za-z]{0,20}",
        index in 0usize..10_000,
    ) {
        let template = FieldPathTemplate::parse(&format!("{}.{{i}}.{}", collection, attribute)).unwrap();
        let path = template.render(index);
        let expected = format!("{}.{}.{}", collection, index, attribute);
        prop_assert_eq!(path.as_str(), expected.as_str());
    }
}
