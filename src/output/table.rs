use comfy_table::Table;
use comfy_table::presets::{ASCII_BORDERS_ONLY_CONDENSED, ASCII_FULL};

use super::Layout;
use crate::types::{QueryOutcome, ResourceKind};

const CORNER_HEADER: &str = "KIND / CONTEXT";
const EMPTY_CELL: &str = "-";
const ERROR_CELL: &str = "error";

pub struct TableFormatter;

impl TableFormatter {
    /// Kinds as rows, contexts as columns; each cell is a small table with one
    /// column per namespace.
    pub fn format(outcome: &QueryOutcome, layout: &Layout) -> String {
        let mut table = Table::new();
        table.load_preset(ASCII_FULL);

        let mut header = vec![CORNER_HEADER.to_string()];
        header.extend(layout.contexts.iter().cloned());
        table.set_header(header);

        for &kind in &layout.kinds {
            let mut row = vec![kind.to_string()];
            for ctx in &layout.contexts {
                row.push(Self::namespace_table(outcome, layout, ctx, kind));
            }
            table.add_row(row);
        }

        let mut output = table.to_string();
        let total = outcome.total();
        output.push_str(&format!(
            "\n({} {})",
            total,
            if total == 1 { "resource" } else { "resources" }
        ));
        if !outcome.failures.is_empty() {
            output.push_str(&format!(", {} failed lookups", outcome.failures.len()));
        }
        output
    }

    fn namespace_table(outcome: &QueryOutcome, layout: &Layout, ctx: &str, kind: ResourceKind) -> String {
        let mut inner = Table::new();
        inner.load_preset(ASCII_BORDERS_ONLY_CONDENSED);
        inner.set_header(layout.namespaces.clone());

        let cells: Vec<String> = layout
            .namespaces
            .iter()
            .map(|ns| Self::cell(outcome, ctx, ns, kind))
            .collect();
        inner.add_row(cells);

        inner.to_string()
    }

    fn cell(outcome: &QueryOutcome, ctx: &str, ns: &str, kind: ResourceKind) -> String {
        let names = outcome
            .find(ctx, ns, kind)
            .map(|set| set.names.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        // A partial result still carries the error marker
        match (names.is_empty(), outcome.failed(ctx, ns, kind)) {
            (true, true) => ERROR_CELL.to_string(),
            (true, false) => EMPTY_CELL.to_string(),
            (false, true) => format!("{}\n({})", names.join("\n"), ERROR_CELL),
            (false, false) => names.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FetchFailure, ResourceSet};

    fn set(ctx: &str, ns: &str, kind: ResourceKind, names: &[&str]) -> ResourceSet {
        ResourceSet {
            context: ctx.to_string(),
            namespace: ns.to_string(),
            kind,
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn layout() -> Layout {
        Layout {
            contexts: vec!["minikube".to_string(), "kind-dev".to_string()],
            namespaces: vec!["kube-system".to_string(), "testing".to_string()],
            kinds: vec![ResourceKind::Pod, ResourceKind::Service],
        }
    }

    #[test]
    fn test_table_headers_and_rows() {
        let outcome = QueryOutcome {
            sets: vec![
                set("minikube", "kube-system", ResourceKind::Pod, &["coredns", "etcd"]),
                set("minikube", "testing", ResourceKind::Pod, &[]),
                set("minikube", "testing", ResourceKind::Service, &["web"]),
            ],
            failures: vec![],
        };

        let output = TableFormatter::format(&outcome, &layout());
        assert!(output.contains(CORNER_HEADER));
        assert!(output.contains("minikube"));
        assert!(output.contains("kind-dev"));
        assert!(output.contains("kube-system"));
        assert!(output.contains("coredns"));
        assert!(output.contains("etcd"));
        assert!(output.contains("web"));
        assert!(output.contains(EMPTY_CELL));
        assert!(output.ends_with("(3 resources)"));

        // kind rows appear in layout order
        let pod_pos = output.find("| pod").unwrap();
        let svc_pos = output.find("| service").unwrap();
        assert!(pod_pos < svc_pos);
    }

    #[test]
    fn test_cell_marks_failures() {
        let outcome = QueryOutcome {
            sets: vec![set("kind-dev", "testing", ResourceKind::Pod, &[])],
            failures: vec![FetchFailure {
                context: "kind-dev".to_string(),
                namespace: "testing".to_string(),
                kind: ResourceKind::Pod,
                selector: "status.phase=Running".to_string(),
                message: "timeout".to_string(),
            }],
        };

        assert_eq!(
            TableFormatter::cell(&outcome, "kind-dev", "testing", ResourceKind::Pod),
            ERROR_CELL
        );
        assert_eq!(
            TableFormatter::cell(&outcome, "kind-dev", "kube-system", ResourceKind::Pod),
            EMPTY_CELL
        );
        let output = TableFormatter::format(&outcome, &layout());
        assert!(output.ends_with("(0 resources), 1 failed lookups"));
    }

    #[test]
    fn test_cell_marks_partial_results() {
        let outcome = QueryOutcome {
            sets: vec![set("minikube", "testing", ResourceKind::Pod, &["web-1"])],
            failures: vec![FetchFailure {
                context: "minikube".to_string(),
                namespace: "testing".to_string(),
                kind: ResourceKind::Pod,
                selector: "status.phase=Pending".to_string(),
                message: "timeout".to_string(),
            }],
        };

        assert_eq!(
            TableFormatter::cell(&outcome, "minikube", "testing", ResourceKind::Pod),
            "web-1\n(error)"
        );
        let output = TableFormatter::format(&outcome, &layout());
        assert!(output.contains("(error)"));
        assert!(output.ends_with("(1 resource), 1 failed lookups"));
    }

    #[test]
    fn test_cell_joins_names_with_newlines() {
        let outcome = QueryOutcome {
            sets: vec![set("minikube", "testing", ResourceKind::Pod, &["b", "a"])],
            failures: vec![],
        };
        assert_eq!(
            TableFormatter::cell(&outcome, "minikube", "testing", ResourceKind::Pod),
            "a\nb"
        );
    }
}
