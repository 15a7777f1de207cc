//! SQL rendering for the query-engine descriptors.
//!
//! Translates the storage-neutral [`FilterExpr`] and [`OrderBy`] trees into
//! Postgres fragments with `$n` bind placeholders. Query text only ever lands
//! in the bind vector; column expressions come exclusively from the
//! server-side [`ColumnMap`], so nothing client-controlled is spliced into
//! SQL.

use courtside_query::{
    order::OrderBy,
    search::{Condition, FilterExpr, Operator, SearchMode, SearchType},
};
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

use crate::{Error, Result};

/// Bind values accumulated while rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Real(f64),
    Int(i64),
}

pub fn push_text(binds: &mut Vec<BindValue>, value: String) -> usize {
    binds.push(BindValue::Text(value));
    binds.len()
}

pub fn push_real(binds: &mut Vec<BindValue>, value: f64) -> usize {
    binds.push(BindValue::Real(value));
    binds.len()
}

pub fn push_int(binds: &mut Vec<BindValue>, value: i64) -> usize {
    binds.push(BindValue::Int(value));
    binds.len()
}

/// Maps canonical field paths (as produced by the query engines) to SQL
/// expressions. Each repository declares its own map; anything absent is
/// unsearchable/unsortable and rejected with a validation error.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    entries: Vec<(String, String)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, expression: &str) -> Self {
        self.entries.push((path.to_string(), expression.to_string()));
        self
    }

    pub fn resolve(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, expr)| expr.as_str())
    }
}

/// Render a filter expression to a SQL predicate.
///
/// Returns `None` for the empty (always-true) filter so callers can omit the
/// clause entirely.
pub fn render_filter(
    expr: &FilterExpr,
    columns: &ColumnMap,
    binds: &mut Vec<BindValue>,
) -> Result<Option<String>> {
    let FilterExpr::Group {
        operator,
        conditions,
    } = expr
    else {
        return Ok(None);
    };
    if conditions.is_empty() {
        return Ok(None);
    }

    let rendered: Vec<String> = conditions
        .iter()
        .map(|condition| render_condition(condition, columns, binds))
        .collect::<Result<_>>()?;

    let joiner = match operator {
        Operator::And => " AND ",
        Operator::Or => " OR ",
    };
    Ok(Some(format!("({})", rendered.join(joiner))))
}

fn render_condition(
    condition: &Condition,
    columns: &ColumnMap,
    binds: &mut Vec<BindValue>,
) -> Result<String> {
    match condition {
        Condition::Match {
            target,
            search_type,
            query,
            mode,
        } => {
            let column = resolve_column(columns, &target.canonical(), "search")?;
            Ok(render_match(column, *search_type, query, *mode, binds))
        }
        Condition::FullText { field, query } => {
            let column = resolve_column(columns, field, "search")?;
            let idx = push_text(binds, query.clone());
            Ok(format!(
                "to_tsvector('simple', {column}) @@ plainto_tsquery('simple', ${idx})"
            ))
        }
        Condition::Similarity {
            field,
            query,
            threshold,
        } => {
            let column = resolve_column(columns, field, "search")?;
            let query_idx = push_text(binds, query.clone());
            let threshold_idx = push_real(binds, *threshold);
            Ok(format!(
                "similarity({column}, ${query_idx}) >= ${threshold_idx}"
            ))
        }
    }
}

fn render_match(
    column: &str,
    search_type: SearchType,
    query: &str,
    mode: SearchMode,
    binds: &mut Vec<BindValue>,
) -> String {
    match search_type {
        SearchType::Contains | SearchType::StartsWith | SearchType::EndsWith => {
            let escaped = escape_like(query);
            let pattern = match search_type {
                SearchType::Contains => format!("%{escaped}%"),
                SearchType::StartsWith => format!("{escaped}%"),
                _ => format!("%{escaped}"),
            };
            let idx = push_text(binds, pattern);
            let like = if mode.is_insensitive() { "ILIKE" } else { "LIKE" };
            format!(r"{column} {like} ${idx} ESCAPE '\'")
        }
        SearchType::Equals => {
            let idx = push_text(binds, query.to_string());
            if mode.is_insensitive() {
                format!("lower({column}) = lower(${idx})")
            } else {
                format!("{column} = ${idx}")
            }
        }
        SearchType::FullText => {
            // Reaches here only when the config did not enable full-text
            // search; degrade to the tsquery form rather than failing.
            let idx = push_text(binds, query.to_string());
            format!("to_tsvector('simple', {column}) @@ plainto_tsquery('simple', ${idx})")
        }
    }
}

/// Render an ordering to a SQL `ORDER BY` body.
///
/// Callers gate client-supplied paths through [`OrderBy::is_allowed`] first;
/// an unmapped path still fails closed here.
pub fn render_order(order: &OrderBy, columns: &ColumnMap) -> Result<String> {
    let path = order.path.canonical();
    let column = resolve_column(columns, &path, "order by")?;
    Ok(format!("{column} {}", order.direction.sql()))
}

fn resolve_column<'a>(columns: &'a ColumnMap, path: &str, verb: &str) -> Result<&'a str> {
    columns
        .resolve(path)
        .ok_or_else(|| Error::Validation(format!("Cannot {verb} field '{path}'")))
}

/// Escape LIKE wildcards so user input matches literally.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Attach accumulated binds to a `query_as` query, in placeholder order.
pub fn bind_query_as<'q, T>(
    mut query: QueryAs<'q, Postgres, T, PgArguments>,
    binds: &'q [BindValue],
) -> QueryAs<'q, Postgres, T, PgArguments> {
    for bind in binds {
        query = match bind {
            BindValue::Text(v) => query.bind(v.as_str()),
            BindValue::Real(v) => query.bind(*v),
            BindValue::Int(v) => query.bind(*v),
        };
    }
    query
}

/// Attach accumulated binds to a scalar query, in placeholder order.
pub fn bind_query_scalar<'q, T>(
    mut query: QueryScalar<'q, Postgres, T, PgArguments>,
    binds: &'q [BindValue],
) -> QueryScalar<'q, Postgres, T, PgArguments> {
    for bind in binds {
        query = match bind {
            BindValue::Text(v) => query.bind(v.as_str()),
            BindValue::Real(v) => query.bind(*v),
            BindValue::Int(v) => query.bind(*v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_query::search::{SearchConfig, SearchParams, SearchableField};
    use courtside_query::{OrderDirection, OrderBy};

    fn columns() -> ColumnMap {
        ColumnMap::new()
            .with("first_name", "u.first_name")
            .with("last_name", "u.last_name")
            .with("created_at", "u.created_at")
            .with(
                "friends._count",
                "(SELECT COUNT(*) FROM friendships f WHERE f.requester_id = u.id OR f.receiver_id = u.id)",
            )
    }

    fn config() -> SearchConfig {
        SearchConfig::new([
            SearchableField::new("first_name"),
            SearchableField::new("last_name"),
        ])
    }

    fn params(query: &str) -> SearchParams {
        SearchParams {
            query: Some(query.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn empty_filter_renders_to_no_clause() {
        let mut binds = Vec::new();
        let sql = render_filter(
            &SearchParams::default().build_where(&config()),
            &columns(),
            &mut binds,
        )
        .unwrap();
        assert!(sql.is_none());
        assert!(binds.is_empty());
    }

    #[test]
    fn contains_insensitive_renders_ilike_per_field() {
        let mut binds = Vec::new();
        let sql = render_filter(&params("abc").build_where(&config()), &columns(), &mut binds)
            .unwrap()
            .unwrap();
        assert_eq!(
            sql,
            r"(u.first_name ILIKE $1 ESCAPE '\' OR u.last_name ILIKE $2 ESCAPE '\')"
        );
        assert_eq!(
            binds,
            vec![
                BindValue::Text("%abc%".to_string()),
                BindValue::Text("%abc%".to_string()),
            ]
        );
    }

    #[test]
    fn like_wildcards_in_the_query_are_escaped() {
        let mut binds = Vec::new();
        let mut p = params("50%_done");
        p.fields = Some(vec!["first_name".to_string()]);
        render_filter(&p.build_where(&config()), &columns(), &mut binds)
            .unwrap()
            .unwrap();
        assert_eq!(binds, vec![BindValue::Text(r"%50\%\_done%".to_string())]);
    }

    #[test]
    fn case_sensitive_equals_renders_plain_comparison() {
        use courtside_query::search::{SearchMode, SearchType};
        let mut binds = Vec::new();
        let p = SearchParams {
            query: Some("abc".to_string()),
            fields: Some(vec!["first_name".to_string()]),
            mode: SearchMode::Default,
            search_type: SearchType::Equals,
        };
        let sql = render_filter(&p.build_where(&config()), &columns(), &mut binds)
            .unwrap()
            .unwrap();
        assert_eq!(sql, "(u.first_name = $1)");
        assert_eq!(binds, vec![BindValue::Text("abc".to_string())]);
    }

    #[test]
    fn full_text_renders_tsquery_over_declared_fields() {
        use courtside_query::search::SearchType;
        let mut search_config = config();
        search_config.enable_full_text_search = true;
        let p = SearchParams {
            query: Some("abc".to_string()),
            search_type: SearchType::FullText,
            ..Default::default()
        };
        let mut binds = Vec::new();
        let sql = render_filter(&p.build_where(&search_config), &columns(), &mut binds)
            .unwrap()
            .unwrap();
        assert!(sql.contains("to_tsvector('simple', u.first_name) @@ plainto_tsquery('simple', $1)"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn fuzzy_renders_similarity_with_bound_threshold() {
        let mut binds = Vec::new();
        let expr = params("abc").build_fuzzy(&config(), 0.3);
        let sql = render_filter(&expr, &columns(), &mut binds).unwrap().unwrap();
        assert!(sql.starts_with("(similarity(u.first_name, $1) >= $2"));
        assert_eq!(binds[1], BindValue::Real(0.3));
    }

    #[test]
    fn unknown_search_field_fails_closed() {
        let mut binds = Vec::new();
        let mut p = params("abc");
        p.fields = Some(vec!["password_hash".to_string()]);
        let result = render_filter(&p.build_where(&config()), &columns(), &mut binds);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn order_renders_column_and_direction() {
        let sql = render_order(
            &OrderBy::new("created_at", OrderDirection::Desc),
            &columns(),
        )
        .unwrap();
        assert_eq!(sql, "u.created_at DESC");
    }

    #[test]
    fn count_order_renders_the_mapped_subquery() {
        let sql = render_order(
            &OrderBy::new("friends._count", OrderDirection::Asc),
            &columns(),
        )
        .unwrap();
        assert!(sql.starts_with("(SELECT COUNT(*)"));
        assert!(sql.ends_with(" ASC"));
    }

    #[test]
    fn unmapped_order_path_fails_closed() {
        let result = render_order(
            &OrderBy::new("sessions._count", OrderDirection::Asc),
            &columns(),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
