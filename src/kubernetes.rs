use crate::planner::{KindSelector, QueryPlan};
use crate::types::{FetchFailure, QueryOutcome, ResourceKind, ResourceSet};
use anyhow::Context;
use futures::stream::{self, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::path::Path;
use tracing::{debug, info, warn};

pub fn load_kubeconfig(path: Option<&Path>) -> anyhow::Result<Kubeconfig> {
    match path {
        Some(p) => Kubeconfig::read_from(p)
            .with_context(|| format!("Failed to read kubeconfig {}", p.display())),
        None => Kubeconfig::read().context("Failed to read kubeconfig"),
    }
}

/// Build one client per context from the given kubeconfig.
pub async fn connect(
    kubeconfig: &Kubeconfig,
    contexts: &[String],
) -> anyhow::Result<Vec<(String, Client)>> {
    let mut clients = Vec::with_capacity(contexts.len());

    for ctx in contexts {
        let options = KubeConfigOptions {
            context: Some(ctx.clone()),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig.clone(), &options)
            .await
            .with_context(|| format!("Failed to load config for context '{}'", ctx))?;
        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", ctx))?;
        info!("Initialized client for context: {}", ctx);
        clients.push((ctx.clone(), client));
    }

    Ok(clients)
}

async fn list_names_generic<K>(
    client: Client,
    namespace: &str,
    selector: &str,
) -> anyhow::Result<Vec<String>>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + serde::de::DeserializeOwned
        + Clone
        + Debug,
    <K as kube::Resource>::DynamicType: Default,
{
    let api: Api<K> = Api::namespaced(client, namespace);
    let lp = ListParams::default().fields(selector);
    let list = api.list_metadata(&lp).await?;
    Ok(list
        .items
        .into_iter()
        .filter_map(|obj| obj.metadata.name)
        .collect())
}

/// List the names of `kind` objects in `namespace` matching a field selector.
pub async fn list_names(
    client: Client,
    kind: ResourceKind,
    namespace: &str,
    selector: &str,
) -> anyhow::Result<Vec<String>> {
    match kind {
        ResourceKind::Pod => list_names_generic::<Pod>(client, namespace, selector).await,
        ResourceKind::Deployment => {
            list_names_generic::<Deployment>(client, namespace, selector).await
        }
        ResourceKind::Service => list_names_generic::<Service>(client, namespace, selector).await,
    }
}

struct Fetch {
    context: String,
    namespace: String,
    target: KindSelector,
    result: anyhow::Result<Vec<String>>,
}

/// Run every selector of the plan against every context and namespace.
///
/// Failed calls are reported in the outcome instead of aborting the rest.
pub async fn execute(
    clients: &[(String, Client)],
    namespaces: &[String],
    plan: &QueryPlan,
    concurrency: usize,
) -> QueryOutcome {
    let mut jobs = Vec::new();
    for (ctx, client) in clients {
        for ns in namespaces {
            for target in &plan.selectors {
                jobs.push((ctx.clone(), client.clone(), ns.clone(), target.clone()));
            }
        }
    }
    debug!("Running {} list calls", jobs.len());

    let fetches: Vec<Fetch> = stream::iter(jobs)
        .map(|(context, client, namespace, target)| async move {
            debug!(
                "[{}] Listing {} in {} with fieldSelector={}",
                context,
                target.kind.plural(),
                namespace,
                target.selector
            );
            let result = list_names(client, target.kind, &namespace, &target.selector).await;
            Fetch {
                context,
                namespace,
                target,
                result,
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let contexts: Vec<String> = clients.iter().map(|(ctx, _)| ctx.clone()).collect();
    collect_outcome(&contexts, namespaces, plan, fetches)
}

fn collect_outcome(
    contexts: &[String],
    namespaces: &[String],
    plan: &QueryPlan,
    fetches: Vec<Fetch>,
) -> QueryOutcome {
    let mut names: BTreeMap<(String, String, ResourceKind), BTreeSet<String>> = BTreeMap::new();
    let mut outcome = QueryOutcome::default();

    for fetch in fetches {
        match fetch.result {
            Ok(found) => {
                names
                    .entry((fetch.context, fetch.namespace, fetch.target.kind))
                    .or_default()
                    .extend(found);
            }
            Err(e) => {
                warn!(
                    "[{}] Listing {} in {} failed: {:#}",
                    fetch.context,
                    fetch.target.kind.plural(),
                    fetch.namespace,
                    e
                );
                outcome.failures.push(FetchFailure {
                    context: fetch.context,
                    namespace: fetch.namespace,
                    kind: fetch.target.kind,
                    selector: fetch.target.selector,
                    message: format!("{:#}", e),
                });
            }
        }
    }

    let kinds = plan.kinds();
    for ctx in contexts {
        for ns in namespaces {
            for &kind in &kinds {
                let key = (ctx.clone(), ns.clone(), kind);
                outcome.sets.push(ResourceSet {
                    context: ctx.clone(),
                    namespace: ns.clone(),
                    kind,
                    names: names.remove(&key).unwrap_or_default(),
                });
            }
        }
    }

    outcome
}
