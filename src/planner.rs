use crate::types::{ResourceKind, UnknownKind};
use sqlparser::ast::{BinaryOperator, Expr, Ident, Value as SqlValue};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Upper bound on conjunctions produced by DNF expansion.
pub const MAX_CONJUNCTIONS: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),

    #[error(
        "WHERE only supports three part identifiers such as 'pod.status.phase', got '{0}'"
    )]
    InvalidIdentifier(String),

    #[error("unsupported operator '{0}' (only =, != and <> are supported, combined with AND/OR)")]
    UnsupportedOperator(String),

    #[error("unsupported value '{0}', expected a quoted string literal")]
    UnsupportedValue(String),

    #[error("unsupported WHERE expression: {0}")]
    UnsupportedExpression(String),

    #[error("WHERE clause expands to more than 64 selector combinations")]
    TooComplex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorOp {
    Eq,
    NotEq,
}

/// One `kind.field.path <op> 'value'` term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub kind: ResourceKind,
    pub path: String,
    pub op: SelectorOp,
    pub value: String,
}

impl Condition {
    pub fn to_selector(&self) -> String {
        match self.op {
            SelectorOp::Eq => format!("{}={}", self.path, escape_value(&self.value)),
            SelectorOp::NotEq => format!("{}!={}", self.path, escape_value(&self.value)),
        }
    }
}

/// Escape `\`, `,` and `=` so a value stays a single selector term.
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ',' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.to_selector())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Condition(Condition),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

impl FilterExpr {
    /// All leaf conditions, left to right.
    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            FilterExpr::Condition(c) => vec![c],
            FilterExpr::And(l, r) | FilterExpr::Or(l, r) => {
                let mut v = l.conditions();
                v.extend(r.conditions());
                v
            }
        }
    }

    /// Expand into disjunctive normal form: an OR of AND-ed condition lists.
    pub fn to_dnf(&self) -> Result<Vec<Vec<Condition>>, PlanError> {
        match self {
            FilterExpr::Condition(c) => Ok(vec![vec![c.clone()]]),
            FilterExpr::Or(l, r) => {
                let mut terms = l.to_dnf()?;
                terms.extend(r.to_dnf()?);
                if terms.len() > MAX_CONJUNCTIONS {
                    return Err(PlanError::TooComplex);
                }
                Ok(terms)
            }
            FilterExpr::And(l, r) => {
                let left = l.to_dnf()?;
                let right = r.to_dnf()?;
                if left.len() * right.len() > MAX_CONJUNCTIONS {
                    return Err(PlanError::TooComplex);
                }
                let mut terms = Vec::with_capacity(left.len() * right.len());
                for a in &left {
                    for b in &right {
                        let mut conj = a.clone();
                        conj.extend(b.iter().cloned());
                        terms.push(conj);
                    }
                }
                Ok(terms)
            }
        }
    }
}

/// A single list call: one kind filtered by one field selector string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KindSelector {
    pub kind: ResourceKind,
    pub selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    pub selectors: Vec<KindSelector>,
}

impl QueryPlan {
    /// Kinds referenced by the plan, in display order.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<ResourceKind> = self.selectors.iter().map(|s| s.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

/// Turn a WHERE tree into the list calls needed to answer it.
///
/// Field selectors are comma-joined per kind within a conjunction. Terms on
/// different kinds cannot constrain each other, so they become separate calls.
pub fn build_plan(filter: &FilterExpr) -> Result<QueryPlan, PlanError> {
    let mut plan = QueryPlan::default();

    for conjunction in filter.to_dnf()? {
        let mut by_kind: BTreeMap<ResourceKind, Vec<String>> = BTreeMap::new();
        for cond in &conjunction {
            let parts = by_kind.entry(cond.kind).or_default();
            let sel = cond.to_selector();
            if !parts.contains(&sel) {
                parts.push(sel);
            }
        }

        for (kind, parts) in by_kind {
            let ks = KindSelector {
                kind,
                selector: parts.join(","),
            };
            if !plan.selectors.contains(&ks) {
                plan.selectors.push(ks);
            }
        }
    }

    Ok(plan)
}

pub fn plan_expr(expr: &Expr) -> Result<FilterExpr, PlanError> {
    match expr {
        Expr::Nested(inner) => plan_expr(inner),
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => Ok(FilterExpr::And(
                Box::new(plan_expr(left)?),
                Box::new(plan_expr(right)?),
            )),
            BinaryOperator::Or => Ok(FilterExpr::Or(
                Box::new(plan_expr(left)?),
                Box::new(plan_expr(right)?),
            )),
            BinaryOperator::Eq => plan_comparison(left, SelectorOp::Eq, right),
            BinaryOperator::NotEq => plan_comparison(left, SelectorOp::NotEq, right),
            other => Err(PlanError::UnsupportedOperator(other.to_string())),
        },
        other => Err(PlanError::UnsupportedExpression(other.to_string())),
    }
}

fn plan_comparison(left: &Expr, op: SelectorOp, right: &Expr) -> Result<FilterExpr, PlanError> {
    // Allow `'Running' = pod.status.phase` as well.
    let (ident, value) = match (left, right) {
        (Expr::CompoundIdentifier(idents), value) => (idents, value),
        (value, Expr::CompoundIdentifier(idents)) => (idents, value),
        (Expr::Identifier(i), _) | (_, Expr::Identifier(i)) if i.quote_style.is_none() => {
            return Err(PlanError::InvalidIdentifier(i.value.clone()));
        }
        _ => return Err(PlanError::UnsupportedExpression(format!("{left} {right}"))),
    };

    if ident.len() != 3 {
        return Err(PlanError::InvalidIdentifier(join_idents(ident)));
    }

    let kind = ident[0].value.parse::<ResourceKind>()?;
    let path = format!("{}.{}", ident[1].value, ident[2].value);
    let value = plan_value(value)?;

    Ok(FilterExpr::Condition(Condition {
        kind,
        path,
        op,
        value,
    }))
}

fn plan_value(expr: &Expr) -> Result<String, PlanError> {
    match expr {
        Expr::Value(v) => match &v.value {
            SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => Ok(s.clone()),
            SqlValue::Number(n, _) => Ok(n.to_string()),
            SqlValue::Boolean(b) => Ok(b.to_string()),
            other => Err(PlanError::UnsupportedValue(other.to_string())),
        },
        // The generic dialect reads "Running" as a quoted identifier.
        Expr::Identifier(ident) if ident.quote_style == Some('"') => Ok(ident.value.clone()),
        other => Err(PlanError::UnsupportedValue(other.to_string())),
    }
}

fn join_idents(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(|i| i.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn where_expr(sql_where: &str) -> Expr {
        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(sql_where)
            .unwrap();
        parser.parse_expr().unwrap()
    }

    fn plan(sql_where: &str) -> Result<QueryPlan, PlanError> {
        build_plan(&plan_expr(&where_expr(sql_where))?)
    }

    fn cond(kind: ResourceKind, path: &str, value: &str) -> Condition {
        Condition {
            kind,
            path: path.to_string(),
            op: SelectorOp::Eq,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_selector_value_is_escaped() {
        let p = plan("pod.metadata.name = 'x,status.phase=Running'").unwrap();
        assert_eq!(p.selectors.len(), 1);
        assert_eq!(p.selectors[0].selector, r"metadata.name=x\,status.phase\=Running");

        let c = cond(ResourceKind::Pod, "spec.nodeName", r"a\b");
        assert_eq!(c.to_selector(), r"spec.nodeName=a\\b");
    }

    #[test]
    fn test_single_condition() {
        let filter = plan_expr(&where_expr("pod.status.phase = 'Running'")).unwrap();
        assert_eq!(
            filter,
            FilterExpr::Condition(cond(ResourceKind::Pod, "status.phase", "Running"))
        );
    }

    #[test]
    fn test_reversed_operands_and_not_eq() {
        let filter = plan_expr(&where_expr("'web' <> service.metadata.name")).unwrap();
        let FilterExpr::Condition(c) = filter else {
            panic!("expected condition");
        };
        assert_eq!(c.op, SelectorOp::NotEq);
        assert_eq!(c.to_selector(), "metadata.name!=web");
    }

    #[test]
    fn test_or_across_kinds() {
        let plan = plan(
            "pod.status.phase = 'Running' OR deployment.metadata.namespace = 'default' \
             OR service.metadata.name = 'nginx'",
        )
        .unwrap();
        assert_eq!(plan.selectors.len(), 3);
        assert_eq!(
            plan.kinds(),
            vec![
                ResourceKind::Pod,
                ResourceKind::Deployment,
                ResourceKind::Service
            ]
        );
        assert_eq!(plan.selectors[1].selector, "metadata.namespace=default");
    }

    #[test]
    fn test_and_same_kind_merges() {
        let plan = plan("pod.status.phase = 'Running' AND pod.spec.nodeName = 'n1'").unwrap();
        assert_eq!(
            plan.selectors,
            vec![KindSelector {
                kind: ResourceKind::Pod,
                selector: "status.phase=Running,spec.nodeName=n1".to_string(),
            }]
        );
    }

    #[test]
    fn test_and_across_kinds_is_independent() {
        let plan =
            plan("pod.status.phase = 'Running' AND service.metadata.name = 'web'").unwrap();
        assert_eq!(plan.selectors.len(), 2);
        assert_eq!(plan.selectors[0].kind, ResourceKind::Pod);
        assert_eq!(plan.selectors[1].selector, "metadata.name=web");
    }

    #[test]
    fn test_distribution_over_or() {
        let plan = plan(
            "(pod.status.phase = 'Running' OR pod.status.phase = 'Pending') \
             AND pod.spec.nodeName = 'n1'",
        )
        .unwrap();
        let selectors: Vec<&str> = plan.selectors.iter().map(|s| s.selector.as_str()).collect();
        assert_eq!(
            selectors,
            vec![
                "status.phase=Running,spec.nodeName=n1",
                "status.phase=Pending,spec.nodeName=n1"
            ]
        );
    }

    #[test]
    fn test_duplicate_selectors_removed() {
        let plan = plan("pod.status.phase = 'Running' OR pod.status.phase = 'Running'").unwrap();
        assert_eq!(plan.selectors.len(), 1);
    }

    #[test]
    fn test_double_quoted_value() {
        let filter = plan_expr(&where_expr("pod.status.phase = \"Failed\"")).unwrap();
        assert_eq!(filter.conditions()[0].value, "Failed");
    }

    #[test]
    fn test_invalid_identifier_length() {
        let err = plan_expr(&where_expr("pod.phase = 'Running'")).unwrap_err();
        assert_eq!(err, PlanError::InvalidIdentifier("pod.phase".to_string()));
    }

    #[test]
    fn test_unknown_kind() {
        let err = plan_expr(&where_expr("secret.metadata.name = 'x'")).unwrap_err();
        assert!(matches!(err, PlanError::UnknownKind(_)));
    }

    #[test]
    fn test_unsupported_operator() {
        let err = plan_expr(&where_expr("pod.status.phase > 'A'")).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedOperator(_)));
    }

    #[test]
    fn test_unsupported_value() {
        let err = plan_expr(&where_expr("pod.status.phase = NULL")).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedValue(_)));
    }

    #[test]
    fn test_too_complex() {
        // (a OR b) AND ... seven times gives 2^7 = 128 conjunctions
        let clause = "(pod.status.phase = 'A' OR pod.status.phase = 'B')";
        let sql = vec![clause; 7].join(" AND ");
        assert_eq!(plan(&sql).unwrap_err(), PlanError::TooComplex);
    }
}
