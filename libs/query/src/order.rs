//! Order engine.
//!
//! Turns a dot-path field specifier plus a direction into an ordering
//! descriptor. A path traverses zero or more relation names and terminates in
//! either a plain field or the literal `_count` segment, which means "order by
//! the count of the final relation's rows".
//!
//! Paths are parsed once into an explicit [`OrderPath`] variant rather than
//! being re-split at render time, so the `_count` aggregate is a distinct,
//! exhaustively matched case instead of a string comparison buried in the
//! renderer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Terminal path segment selecting a relation-count aggregate.
pub const COUNT_SEGMENT: &str = "_count";

/// Field used when the request does not name one.
pub const DEFAULT_ORDER_FIELD: &str = "created_at";

/// Sort direction. Exactly two-valued; ties fall back to the storage layer's
/// natural row order, which is not guaranteed stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

impl OrderDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The SQL keyword for this direction.
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A parsed `orderBy` dot-path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPath {
    /// A plain top-level field, e.g. `created_at`.
    Field(String),
    /// A field reached through one or more relations, e.g. `team.name`.
    Nested {
        relations: Vec<String>,
        field: String,
    },
    /// The row count of a relation path, e.g. `team.players._count`.
    Count { relations: Vec<String> },
}

impl OrderPath {
    /// Parse a dot-path. Never fails: an unknown shape is still one of the
    /// three variants, and permission checks happen in [`OrderBy::is_allowed`].
    pub fn parse(order_by: &str) -> Self {
        if !order_by.contains('.') {
            return Self::Field(order_by.to_string());
        }

        let parts: Vec<&str> = order_by.split('.').collect();
        let Some((last, relations)) = parts.split_last() else {
            return Self::Field(order_by.to_string());
        };

        if *last == COUNT_SEGMENT {
            Self::Count {
                relations: relations.iter().map(|s| s.to_string()).collect(),
            }
        } else {
            Self::Nested {
                relations: relations.iter().map(|s| s.to_string()).collect(),
                field: last.to_string(),
            }
        }
    }

    /// The dotted form this path was parsed from.
    pub fn canonical(&self) -> String {
        match self {
            Self::Field(field) => field.clone(),
            Self::Nested { relations, field } => {
                let mut parts = relations.clone();
                parts.push(field.clone());
                parts.join(".")
            }
            Self::Count { relations } => {
                let mut parts = relations.clone();
                parts.push(COUNT_SEGMENT.to_string());
                parts.join(".")
            }
        }
    }
}

/// A complete ordering request: parsed path plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub path: OrderPath,
    pub direction: OrderDirection,
}

impl Default for OrderBy {
    fn default() -> Self {
        Self {
            path: OrderPath::Field(DEFAULT_ORDER_FIELD.to_string()),
            direction: OrderDirection::Desc,
        }
    }
}

impl OrderBy {
    pub fn new(order_by: &str, direction: OrderDirection) -> Self {
        Self {
            path: OrderPath::parse(order_by),
            direction,
        }
    }

    /// Render the right-nested ordering descriptor.
    ///
    /// `name` becomes `{"name": "asc"}`, `team.name` becomes
    /// `{"team": {"name": "desc"}}`, and `team.players._count` becomes
    /// `{"team": {"players": {"_count": "asc"}}}`.
    pub fn to_value(&self) -> Value {
        let dir = Value::String(self.direction.as_str().to_string());
        match &self.path {
            OrderPath::Field(field) => leaf(field, dir),
            OrderPath::Nested { relations, field } => nest(relations, leaf(field, dir)),
            OrderPath::Count { relations } => {
                // The innermost relation carries the `_count` key.
                match relations.split_last() {
                    Some((last, outer)) => {
                        nest(outer, leaf(last, leaf(COUNT_SEGMENT, dir)))
                    }
                    None => leaf(COUNT_SEGMENT, dir),
                }
            }
        }
    }

    /// Check a client-supplied path against an allow-list.
    ///
    /// Top-level fields must appear in `allowed_fields`. `_count` paths
    /// require every relation segment to be a key of `allowed_relations`.
    /// Other nested paths require the first segment to be an allowed relation
    /// and either the remaining dotted suffix or each remaining segment
    /// individually to be declared for that relation.
    ///
    /// The builder itself performs no validation; callers gate untrusted
    /// `orderBy` input through this before rendering.
    pub fn is_allowed(
        &self,
        allowed_fields: &[&str],
        allowed_relations: &[(&str, &[&str])],
    ) -> bool {
        let relation_declared =
            |name: &str| allowed_relations.iter().any(|(rel, _)| *rel == name);
        let relation_fields = |name: &str| {
            allowed_relations
                .iter()
                .find(|(rel, _)| *rel == name)
                .map(|(_, fields)| *fields)
        };

        match &self.path {
            OrderPath::Field(field) => allowed_fields.contains(&field.as_str()),
            OrderPath::Count { relations } => {
                !relations.is_empty() && relations.iter().all(|r| relation_declared(r))
            }
            OrderPath::Nested { relations, field } => {
                let Some(first) = relations.first() else {
                    return false;
                };
                let Some(fields) = relation_fields(first) else {
                    return false;
                };

                let mut remainder: Vec<&str> =
                    relations[1..].iter().map(|s| s.as_str()).collect();
                remainder.push(field.as_str());

                let suffix = remainder.join(".");
                fields.contains(&suffix.as_str())
                    || remainder.iter().all(|part| fields.contains(part))
            }
        }
    }
}

fn leaf(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn nest(relations: &[String], innermost: Value) -> Value {
    relations.iter().rev().fold(innermost, |acc, relation| {
        let mut map = Map::new();
        map.insert(relation.clone(), acc);
        Value::Object(map)
    })
}
