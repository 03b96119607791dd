//! Field selector support per resource kind.
//!
//! The API server rejects list calls whose `fieldSelector` names a field the
//! resource does not index, so unsupported paths are caught before any request
//! is made. The server does not advertise these, hence the hardcoded table:
//! https://kubernetes.io/docs/concepts/overview/working-with-objects/field-selectors/#supported-fields

use crate::types::ResourceKind;

/// Fields every kind supports.
const COMMON_FIELDS: &[&str] = &["metadata.name", "metadata.namespace"];

const POD_FIELDS: &[&str] = &[
    "metadata.name",
    "metadata.namespace",
    "spec.nodeName",
    "spec.restartPolicy",
    "spec.schedulerName",
    "spec.serviceAccountName",
    "spec.hostNetwork",
    "status.phase",
    "status.podIP",
    "status.podIPs",
    "status.nominatedNodeName",
];

pub fn supported_fields(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Pod => POD_FIELDS,
        ResourceKind::Deployment | ResourceKind::Service => COMMON_FIELDS,
    }
}

pub fn is_supported(kind: ResourceKind, path: &str) -> bool {
    supported_fields(kind).contains(&path)
}
