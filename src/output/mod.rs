mod table;

pub use table::TableFormatter;

use crate::cli::OutputFormat;
use crate::types::{FetchFailure, QueryOutcome, ResourceKind, ResourceSet};
use anyhow::Context;
use serde::Serialize;

/// Column and row order for rendering, taken from the query.
#[derive(Debug, Clone)]
pub struct Layout {
    pub contexts: Vec<String>,
    pub namespaces: Vec<String>,
    pub kinds: Vec<ResourceKind>,
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    #[serde(flatten)]
    set: &'a ResourceSet,
    /// Set when at least one lookup for this cell failed, so `names` may be partial.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    failed: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    results: Vec<ReportEntry<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<&'a FetchFailure>,
}

impl<'a> Report<'a> {
    fn new(outcome: &'a QueryOutcome, layout: &Layout) -> Self {
        let mut results = Vec::new();
        for ctx in &layout.contexts {
            for ns in &layout.namespaces {
                for &kind in &layout.kinds {
                    if let Some(set) = outcome.find(ctx, ns, kind) {
                        results.push(ReportEntry {
                            set,
                            failed: outcome.failed(ctx, ns, kind),
                        });
                    }
                }
            }
        }
        Self {
            results,
            failures: outcome.failures.iter().collect(),
        }
    }
}

pub fn render(outcome: &QueryOutcome, layout: &Layout, format: &OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Table => Ok(TableFormatter::format(outcome, layout)),
        OutputFormat::Json => serde_json::to_string_pretty(&Report::new(outcome, layout))
            .context("Failed to serialize result as JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(&Report::new(outcome, layout))
            .context("Failed to serialize result as YAML"),
    }
}
