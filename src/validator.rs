use crate::field_selectors;
use crate::planner::FilterExpr;
use crate::types::ResourceKind;
use kube::config::Kubeconfig;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("context(s) not found in kubeconfig: {}", .0.join(", "))]
    ContextNotFound(Vec<String>),

    #[error("field '{path}' cannot be used to select {kind}s (supported: {})", .supported.join(", "))]
    UnsupportedField {
        kind: ResourceKind,
        path: String,
        supported: Vec<String>,
    },

    #[error("'{0}' is not a valid namespace name")]
    InvalidNamespace(String),
}

/// Every requested context must exist in the kubeconfig.
pub fn validate_contexts(kubeconfig: &Kubeconfig, contexts: &[String]) -> Result<(), ValidationError> {
    let not_found: Vec<String> = contexts
        .iter()
        .filter(|ctx| kubeconfig.contexts.iter().all(|c| &c.name != *ctx))
        .cloned()
        .collect();

    if !not_found.is_empty() {
        return Err(ValidationError::ContextNotFound(not_found));
    }

    Ok(())
}

pub fn validate_fields(filter: &FilterExpr) -> Result<(), ValidationError> {
    for cond in filter.conditions() {
        if !field_selectors::is_supported(cond.kind, &cond.path) {
            return Err(ValidationError::UnsupportedField {
                kind: cond.kind,
                path: cond.path.clone(),
                supported: field_selectors::supported_fields(cond.kind)
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            });
        }
    }
    Ok(())
}

/// Namespaces are DNS-1123 labels.
pub fn validate_namespaces(namespaces: &[String]) -> Result<(), ValidationError> {
    for ns in namespaces {
        if !is_dns1123_label(ns) {
            return Err(ValidationError::InvalidNamespace(ns.clone()));
        }
    }
    Ok(())
}

fn is_dns1123_label(s: &str) -> bool {
    let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    !s.is_empty()
        && s.len() <= 63
        && s.chars().all(|c| valid_char(c) || c == '-')
        && s.chars().next().is_some_and(valid_char)
        && s.chars().last().is_some_and(valid_char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{Condition, SelectorOp};

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: minikube
clusters:
- name: minikube
  cluster:
    server: https://127.0.0.1:8443
contexts:
- name: minikube
  context:
    cluster: minikube
    user: minikube
- name: gke_proj_zone_prod
  context:
    cluster: minikube
    user: minikube
users:
- name: minikube
  user:
    token: abc
"#;

    fn kubeconfig() -> Kubeconfig {
        Kubeconfig::from_yaml(KUBECONFIG).unwrap()
    }

    fn filter(kind: ResourceKind, path: &str) -> FilterExpr {
        FilterExpr::Condition(Condition {
            kind,
            path: path.to_string(),
            op: SelectorOp::Eq,
            value: "x".to_string(),
        })
    }

    #[test]
    fn test_contexts_found() {
        let ctxs = vec!["minikube".to_string(), "gke_proj_zone_prod".to_string()];
        assert!(validate_contexts(&kubeconfig(), &ctxs).is_ok());
    }

    #[test]
    fn test_contexts_not_found_lists_all_missing() {
        let ctxs = vec![
            "staging".to_string(),
            "minikube".to_string(),
            "prod".to_string(),
        ];
        let err = validate_contexts(&kubeconfig(), &ctxs).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ContextNotFound(vec!["staging".to_string(), "prod".to_string()])
        );
        assert_eq!(
            err.to_string(),
            "context(s) not found in kubeconfig: staging, prod"
        );
    }

    #[test]
    fn test_fields_supported() {
        assert!(validate_fields(&filter(ResourceKind::Pod, "status.phase")).is_ok());
        assert!(validate_fields(&filter(ResourceKind::Service, "metadata.name")).is_ok());
    }

    #[test]
    fn test_fields_unsupported() {
        let expr = FilterExpr::Or(
            Box::new(filter(ResourceKind::Pod, "status.phase")),
            Box::new(filter(ResourceKind::Deployment, "status.phase")),
        );
        match validate_fields(&expr).unwrap_err() {
            ValidationError::UnsupportedField { kind, path, .. } => {
                assert_eq!(kind, ResourceKind::Deployment);
                assert_eq!(path, "status.phase");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_namespaces() {
        let ok = vec!["kube-system".to_string(), "testing".to_string(), "a1".to_string()];
        assert!(validate_namespaces(&ok).is_ok());

        for bad in ["kube_system", "-lead", "trail-", "Upper", ""] {
            assert_eq!(
                validate_namespaces(&[bad.to_string()]).unwrap_err(),
                ValidationError::InvalidNamespace(bad.to_string())
            );
        }
        assert!(validate_namespaces(&["a".repeat(64)]).is_err());
    }
}
