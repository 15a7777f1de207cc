//! Request extractors.
//!
//! Query DTOs reject out-of-range input with a validation error; the query
//! engines only ever see values the DTO already vouched for.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use courtside_query::{
    order::{OrderBy, OrderDirection},
    pagination::{PageParams, DEFAULT_LIMIT, FIRST_PAGE},
    search::{SearchMode, SearchParams, SearchType, MAX_QUERY_LEN},
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::Validate;

use crate::{Error, Result};

/// Deserialize the query string, then run `validator` rules on it.
pub struct ValidatedQuery<T>(pub T);

#[async_trait::async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|err| Error::validation(err.to_string()))?;
        value
            .validate()
            .map_err(|err| Error::validation(flatten_errors(&err)))?;
        Ok(Self(value))
    }
}

fn flatten_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let detail = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "invalid value".to_string());
            format!("{field}: {detail}")
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

/// Page/limit query parameters shared by every listing endpoint.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct PageQuery {
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 5, max = 50, message = "must be between 5 and 50"))]
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams::new(
            self.page.unwrap_or(FIRST_PAGE),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        )
    }
}

/// Full listing query: pagination plus ordering and search.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ListQuery {
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 5, max = 50, message = "must be between 5 and 50"))]
    pub limit: Option<i64>,
    pub order_by: Option<String>,
    pub order_dir: Option<OrderDirection>,
    #[validate(length(min = 1, max = MAX_QUERY_LEN, message = "must be 1 to 100 characters"))]
    pub query: Option<String>,
    /// Comma-separated list of fields to search.
    pub fields: Option<String>,
    pub mode: Option<SearchMode>,
    pub search_type: Option<SearchType>,
}

impl ListQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams::new(
            self.page.unwrap_or(FIRST_PAGE),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        )
    }

    pub fn order(&self) -> OrderBy {
        match &self.order_by {
            Some(path) => OrderBy::new(path, self.order_dir.unwrap_or_default()),
            None => OrderBy {
                direction: self.order_dir.unwrap_or_default(),
                ..OrderBy::default()
            },
        }
    }

    pub fn search(&self) -> SearchParams {
        let fields = self.fields.as_ref().map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        });
        SearchParams {
            query: self.query.clone(),
            fields: fields.filter(|f| !f.is_empty()),
            mode: self.mode.unwrap_or_default(),
            search_type: self.search_type.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_limit_fails_validation() {
        let query = ListQuery {
            limit: Some(1000),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn overlong_query_fails_validation() {
        let query = ListQuery {
            query: Some("x".repeat(MAX_QUERY_LEN as usize + 1)),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let query = ListQuery {
            query: Some("x".repeat(MAX_QUERY_LEN as usize)),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn defaults_produce_page_one_created_at_desc() {
        let query = ListQuery::default();
        assert!(query.validate().is_ok());
        assert_eq!(query.page_params(), PageParams::default());
        assert_eq!(query.order(), OrderBy::default());
        assert!(!query.search().is_active());
    }

    #[test]
    fn fields_list_is_comma_separated() {
        let query = ListQuery {
            fields: Some("first_name, last_name,,".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.search().fields,
            Some(vec!["first_name".to_string(), "last_name".to_string()])
        );
    }
}
