//! Permission grant attached to a read query

use serde_json::{json, Value};

/// Resources the grant applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    /// Wildcard (`*`)
    Any,
    Arns(Vec<String>),
}

impl ResourceScope {
    pub fn to_list(&self) -> Vec<String> {
        match self {
            ResourceScope::Any => vec!["*".to_string()],
            ResourceScope::Arns(arns) => arns.clone(),
        }
    }
}

/// Allow statement for exactly one read action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    action: String,
    scope: ResourceScope,
}

impl PolicyStatement {
    /// Grant for `service`/`action`, e.g. `EC2`/`describeNetworkInterfaces`
    /// becomes `ec2:DescribeNetworkInterfaces` on `*`.
    pub fn for_call(service: &str, action: &str) -> Self {
        Self {
            action: iam_action(service, action),
            scope: ResourceScope::Any,
        }
    }

    pub fn scoped_to(mut self, arns: Vec<String>) -> Self {
        self.scope = if arns.is_empty() {
            ResourceScope::Any
        } else {
            ResourceScope::Arns(arns)
        };
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn scope(&self) -> &ResourceScope {
        &self.scope
    }

    pub fn to_document(&self) -> Value {
        json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Action": [self.action],
                "Resource": self.scope.to_list(),
            }]
        })
    }
}

fn iam_action(service: &str, action: &str) -> String {
    let mut chars = action.chars();
    let action = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{}:{}", service.to_lowercase(), action)
}
