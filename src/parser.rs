use crate::planner::{self, FilterExpr, PlanError};
use sqlparser::ast::{
    Expr, GroupByExpr, ObjectName, Select, SelectItem, SetExpr, Statement, TableFactor,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("invalid SQL: {0}")]
    Syntax(#[from] sqlparser::parser::ParserError),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("SELECT needs at least one namespace")]
    SelectProjectionsRequired,

    #[error("FROM needs at least one context")]
    SelectFromRequired,

    #[error("WHERE is required to build the field selector(s)")]
    WhereRequired,

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// A query split into the parts that drive the API calls:
/// `SELECT <namespaces> FROM <contexts> WHERE <filter>`.
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub namespaces: Vec<String>,
    pub contexts: Vec<String>,
    pub filter: FilterExpr,
}

pub fn parse_sql(sql: &str) -> Result<ParsedQuery, ParserError> {
    let dialect = GenericDialect {};
    let sql = quote_hyphenated(sql.trim().trim_end_matches(';'));

    let mut statements = Parser::parse_sql(&dialect, &sql)?;
    if statements.len() != 1 {
        return Err(ParserError::Unsupported(format!(
            "expected exactly one statement, got {}",
            statements.len()
        )));
    }

    let query = match statements.remove(0) {
        Statement::Query(query) => query,
        other => {
            return Err(ParserError::Unsupported(format!(
                "only SELECT statements are supported, got: {other}"
            )));
        }
    };

    if query.with.is_some() {
        return Err(ParserError::Unsupported("WITH is not supported".to_string()));
    }
    if query.order_by.is_some() {
        return Err(ParserError::Unsupported("ORDER BY is not supported".to_string()));
    }
    if query.limit_clause.is_some() {
        return Err(ParserError::Unsupported("LIMIT is not supported".to_string()));
    }

    let select = match *query.body {
        SetExpr::Select(select) => select,
        other => {
            return Err(ParserError::Unsupported(format!(
                "an unsupported query body was given: {other}"
            )));
        }
    };

    if select.distinct.is_some() {
        return Err(ParserError::Unsupported("DISTINCT is not supported".to_string()));
    }
    if select.having.is_some() {
        return Err(ParserError::Unsupported("HAVING is not supported".to_string()));
    }
    if let GroupByExpr::Expressions(exprs, _) = &select.group_by
        && !exprs.is_empty()
    {
        return Err(ParserError::Unsupported("GROUP BY is not supported".to_string()));
    }
    if matches!(select.group_by, GroupByExpr::All(_)) {
        return Err(ParserError::Unsupported("GROUP BY is not supported".to_string()));
    }
    if let Some(clause) = unsupported_select_clause(&select) {
        return Err(ParserError::Unsupported(format!("{clause} is not supported")));
    }

    // SELECT ...
    if select.projection.is_empty() {
        return Err(ParserError::SelectProjectionsRequired);
    }
    let mut namespaces = Vec::new();
    for item in &select.projection {
        let ns = match item {
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => ident.value.clone(),
            SelectItem::UnnamedExpr(Expr::CompoundIdentifier(idents)) => idents
                .iter()
                .map(|i| i.value.as_str())
                .collect::<Vec<_>>()
                .join("."),
            SelectItem::ExprWithAlias { .. } => {
                return Err(ParserError::Unsupported(
                    "SELECT does not support aliases".to_string(),
                ));
            }
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _) => {
                return Err(ParserError::Unsupported(
                    "SELECT does not support wildcards, list the namespaces".to_string(),
                ));
            }
            other => {
                return Err(ParserError::Unsupported(format!(
                    "SELECT items must be namespace names, got: {other}"
                )));
            }
        };
        push_unique(&mut namespaces, ns);
    }

    // FROM ...
    if select.from.is_empty() {
        return Err(ParserError::SelectFromRequired);
    }
    let mut contexts = Vec::new();
    for table in &select.from {
        if !table.joins.is_empty() {
            return Err(ParserError::Unsupported("FROM does not support JOIN".to_string()));
        }
        match &table.relation {
            TableFactor::Table {
                name,
                alias,
                args,
                with_hints,
                ..
            } => {
                if alias.is_some() {
                    return Err(ParserError::Unsupported(
                        "FROM does not support aliases".to_string(),
                    ));
                }
                if args.is_some() {
                    return Err(ParserError::Unsupported(
                        "FROM does not support table arguments".to_string(),
                    ));
                }
                if !with_hints.is_empty() {
                    return Err(ParserError::Unsupported(
                        "FROM does not support table hints".to_string(),
                    ));
                }
                push_unique(&mut contexts, context_name(name));
            }
            other => {
                return Err(ParserError::Unsupported(format!(
                    "FROM only accepts context names, got: {other}"
                )));
            }
        }
    }

    // WHERE ...
    let filter = match &select.selection {
        Some(expr) => planner::plan_expr(expr)?,
        None => return Err(ParserError::WhereRequired),
    };

    Ok(ParsedQuery {
        namespaces,
        contexts,
        filter,
    })
}

/// First dialect-specific SELECT clause present, if any.
fn unsupported_select_clause(select: &Select) -> Option<&'static str> {
    let present = [
        ("TOP", select.top.is_some()),
        ("INTO", select.into.is_some()),
        ("PREWHERE", select.prewhere.is_some()),
        ("QUALIFY", select.qualify.is_some()),
        ("CONNECT BY", select.connect_by.is_some()),
        ("WINDOW", !select.named_window.is_empty()),
        ("LATERAL VIEW", !select.lateral_views.is_empty()),
        ("SORT BY", !select.sort_by.is_empty()),
        ("CLUSTER BY", !select.cluster_by.is_empty()),
        ("DISTRIBUTE BY", !select.distribute_by.is_empty()),
    ];
    present
        .into_iter()
        .find_map(|(clause, found)| found.then_some(clause))
}

fn context_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|part| match part.as_ident() {
            Some(ident) => ident.value.clone(),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Double-quote bare words containing `-` so `kube-system` parses as one
/// identifier. Each dot-separated part is quoted on its own; quoted text and
/// parts that do not start with an alphanumeric are left alone.
pub fn quote_hyphenated(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut word = String::new();
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
            word.push(c);
            continue;
        }

        flush_word(&mut out, &mut word);
        if c == '\'' || c == '"' || c == '`' {
            quote = Some(c);
        }
        out.push(c);
    }
    flush_word(&mut out, &mut word);

    out
}

fn flush_word(out: &mut String, word: &mut String) {
    if word.is_empty() {
        return;
    }
    let parts: Vec<String> = word
        .split('.')
        .map(|part| {
            let starts_alnum = part.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
            let is_number = part.chars().all(|c| c.is_ascii_digit());
            if part.contains('-') && starts_alnum && !is_number {
                format!("\"{part}\"")
            } else {
                part.to_string()
            }
        })
        .collect();
    out.push_str(&parts.join("."));
    word.clear();
}
