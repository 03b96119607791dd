use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kubernetes resource kinds that can appear in a WHERE clause.
///
/// Declaration order is the order kinds are displayed in.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pod,
    Deployment,
    Service,
}

impl ResourceKind {
    pub fn all() -> [ResourceKind; 3] {
        [
            ResourceKind::Pod,
            ResourceKind::Deployment,
            ResourceKind::Service,
        ]
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pods",
            ResourceKind::Deployment => "deployments",
            ResourceKind::Service => "services",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Pod => write!(f, "pod"),
            ResourceKind::Deployment => write!(f, "deployment"),
            ResourceKind::Service => write!(f, "service"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown resource kind '{0}' (expected pod, deployment or service)")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "pod" | "pods" | "po" => Ok(ResourceKind::Pod),
            "deployment" | "deployments" | "deploy" => Ok(ResourceKind::Deployment),
            "service" | "services" | "svc" => Ok(ResourceKind::Service),
            _ => Err(UnknownKind(input.to_string())),
        }
    }
}

/// Names matched for one kind in one namespace of one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSet {
    pub context: String,
    pub namespace: String,
    pub kind: ResourceKind,
    pub names: BTreeSet<String>,
}

/// A list call that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub context: String,
    pub namespace: String,
    pub kind: ResourceKind,
    pub selector: String,
    pub message: String,
}

/// A single matched resource, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResultRow {
    pub context: String,
    pub namespace: String,
    pub kind: ResourceKind,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub sets: Vec<ResourceSet>,
    pub failures: Vec<FetchFailure>,
}

impl QueryOutcome {
    pub fn find(&self, context: &str, namespace: &str, kind: ResourceKind) -> Option<&ResourceSet> {
        self.sets
            .iter()
            .find(|s| s.context == context && s.namespace == namespace && s.kind == kind)
    }

    pub fn failed(&self, context: &str, namespace: &str, kind: ResourceKind) -> bool {
        self.failures
            .iter()
            .any(|f| f.context == context && f.namespace == namespace && f.kind == kind)
    }

    pub fn rows(&self) -> Vec<ResultRow> {
        let mut rows: Vec<ResultRow> = self
            .sets
            .iter()
            .flat_map(|set| {
                set.names.iter().map(move |name| ResultRow {
                    context: set.context.clone(),
                    namespace: set.namespace.clone(),
                    kind: set.kind,
                    name: name.clone(),
                })
            })
            .collect();
        rows.sort();
        rows
    }

    pub fn total(&self) -> usize {
        self.sets.iter().map(|s| s.names.len()).sum()
    }
}
