//! Search engine.
//!
//! Converts a free-text query plus a caller-declared set of searchable fields
//! into a boolean filter expression. The engine never raises: an absent or
//! blank query yields [`FilterExpr::Empty`], which leaves the result set
//! unfiltered.
//!
//! The output is an expression tree, not a query string. Storage adapters
//! render it into their own dialect and must pass the query text through
//! parameter binding; nothing here escapes or sanitizes beyond trimming.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Longest accepted query string; HTTP DTO validation enforces this.
pub const MAX_QUERY_LEN: u64 = 100;

/// Default trigram-similarity threshold for [`SearchParams::build_fuzzy`].
pub const DEFAULT_SIMILARITY: f64 = 0.3;

/// Case-sensitivity mode, propagated unchanged into every leaf condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Insensitive,
    Default,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insensitive => "insensitive",
            Self::Default => "default",
        }
    }

    pub fn is_insensitive(self) -> bool {
        matches!(self, Self::Insensitive)
    }
}

/// The match operation applied to each searchable field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    FullText,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Equals => "equals",
            Self::FullText => "fullText",
        }
    }
}

/// How per-field conditions combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Operator {
    And,
    #[default]
    Or,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Request-side search parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    /// Explicit fields to search; when absent, every field declared in the
    /// [`SearchConfig`] is searched.
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub search_type: SearchType,
}

/// A field declared searchable by the calling service.
#[derive(Debug, Clone)]
pub struct SearchableField {
    pub field: String,
    /// Ranking weight for full-text search; unused by the boolean builders.
    pub weight: Option<u32>,
    /// Relation qualifier for nested fields.
    pub relation: Option<String>,
}

impl SearchableField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            weight: None,
            relation: None,
        }
    }
}

/// Caller-supplied search configuration (never client-controlled).
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub searchable_fields: Vec<SearchableField>,
    pub enable_full_text_search: bool,
    pub default_operator: Operator,
}

impl SearchConfig {
    pub fn new(fields: impl IntoIterator<Item = SearchableField>) -> Self {
        Self {
            searchable_fields: fields.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// The column a condition applies to: flat, or nested through a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    Field(String),
    Nested { relation: String, field_path: String },
}

impl FieldTarget {
    /// Split a field path on its first `.` into relation head and field tail.
    pub fn parse(path: &str) -> Self {
        match path.split_once('.') {
            Some((relation, field_path)) => Self::Nested {
                relation: relation.to_string(),
                field_path: field_path.to_string(),
            },
            None => Self::Field(path.to_string()),
        }
    }

    pub fn canonical(&self) -> String {
        match self {
            Self::Field(field) => field.clone(),
            Self::Nested {
                relation,
                field_path,
            } => format!("{relation}.{field_path}"),
        }
    }
}

/// One leaf of a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `target` matches `query` under `search_type` and `mode`.
    Match {
        target: FieldTarget,
        search_type: SearchType,
        query: String,
        mode: SearchMode,
    },
    /// Full-text match on a flat field.
    FullText { field: String, query: String },
    /// Trigram similarity of at least `threshold`.
    Similarity {
        field: String,
        query: String,
        threshold: f64,
    },
}

/// A boolean filter expression over search conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Always-true filter; applying it leaves the result set unchanged.
    Empty,
    Group {
        operator: Operator,
        conditions: Vec<Condition>,
    },
}

impl FilterExpr {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Render the nested-map descriptor for storage layers that speak it.
    ///
    /// `Empty` renders as `{}`; groups render as
    /// `{"OR": [{"name": {"contains": "abc", "mode": "insensitive"}}, ...]}`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Empty => Value::Object(Map::new()),
            Self::Group {
                operator,
                conditions,
            } => {
                let rendered: Vec<Value> = conditions.iter().map(Condition::to_value).collect();
                let mut map = Map::new();
                map.insert(operator.as_str().to_string(), Value::Array(rendered));
                Value::Object(map)
            }
        }
    }
}

impl Condition {
    fn to_value(&self) -> Value {
        match self {
            Self::Match {
                target,
                search_type,
                query,
                mode,
            } => {
                let mut inner = Map::new();
                inner.insert(
                    search_type.as_str().to_string(),
                    Value::String(query.clone()),
                );
                inner.insert("mode".to_string(), Value::String(mode.as_str().to_string()));
                wrap_target(target, Value::Object(inner))
            }
            Self::FullText { field, query } => {
                let mut inner = Map::new();
                inner.insert("search".to_string(), Value::String(query.clone()));
                singleton(field, Value::Object(inner))
            }
            Self::Similarity {
                field,
                query,
                threshold,
            } => {
                let mut sim = Map::new();
                sim.insert("gte".to_string(), Value::from(*threshold));
                sim.insert("query".to_string(), Value::String(query.clone()));
                let mut inner = Map::new();
                inner.insert("similarity".to_string(), Value::Object(sim));
                singleton(field, Value::Object(inner))
            }
        }
    }
}

fn singleton(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn wrap_target(target: &FieldTarget, condition: Value) -> Value {
    match target {
        FieldTarget::Field(field) => singleton(field, condition),
        FieldTarget::Nested {
            relation,
            field_path,
        } => singleton(relation, singleton(field_path, condition)),
    }
}

impl SearchParams {
    /// True iff a non-blank query is present.
    pub fn is_active(&self) -> bool {
        self.query
            .as_deref()
            .is_some_and(|q| !q.trim().is_empty())
    }

    /// The query split on runs of whitespace, empty tokens dropped.
    ///
    /// This is a lazy, restartable view over the stored query, not a cached
    /// collection.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.query
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
    }

    /// The fields actually searched: the request's explicit list when
    /// present, else every declared searchable field.
    fn effective_fields<'a>(&'a self, config: &'a SearchConfig) -> Vec<&'a str> {
        match &self.fields {
            Some(fields) if !fields.is_empty() => {
                fields.iter().map(String::as_str).collect()
            }
            _ => config
                .searchable_fields
                .iter()
                .map(|f| f.field.as_str())
                .collect(),
        }
    }

    /// Build the boolean filter for this request.
    pub fn build_where(&self, config: &SearchConfig) -> FilterExpr {
        let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
        else {
            return FilterExpr::Empty;
        };

        if self.search_type == SearchType::FullText && config.enable_full_text_search {
            let conditions = config
                .searchable_fields
                .iter()
                .map(|f| Condition::FullText {
                    field: f.field.clone(),
                    query: query.to_string(),
                })
                .collect();
            return FilterExpr::Group {
                operator: Operator::Or,
                conditions,
            };
        }

        let conditions = self
            .effective_fields(config)
            .into_iter()
            .map(|field| Condition::Match {
                target: FieldTarget::parse(field),
                search_type: self.search_type,
                query: query.to_string(),
                mode: self.mode,
            })
            .collect();

        FilterExpr::Group {
            operator: config.default_operator,
            conditions,
        }
    }

    /// Build a trigram-similarity filter (`similarity >= threshold` per
    /// field, OR-joined). Intended for storage backends with a trigram
    /// capability; the query travels as a bound parameter only.
    pub fn build_fuzzy(&self, config: &SearchConfig, threshold: f64) -> FilterExpr {
        if !self.is_active() {
            return FilterExpr::Empty;
        }
        let query = self.query.as_deref().unwrap_or_default();

        let conditions = self
            .effective_fields(config)
            .into_iter()
            .map(|field| Condition::Similarity {
                field: field.to_string(),
                query: query.to_string(),
                threshold,
            })
            .collect();

        FilterExpr::Group {
            operator: Operator::Or,
            conditions,
        }
    }
}
