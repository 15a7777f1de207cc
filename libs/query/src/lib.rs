//! Query-construction engines shared by the Courtside services.
//!
//! Three pure, stateless builders translate validated request parameters into
//! storage-neutral query fragments:
//!
//! - [`pagination`] — page/limit windows plus response metadata
//! - [`order`] — dot-path ordering (nested relations, `_count` aggregates)
//! - [`search`] — free-text search over declared searchable fields
//!
//! None of the engines perform I/O or raise domain errors: malformed input
//! degrades to a default or an empty filter, and callers validate
//! client-supplied paths before trusting them (see
//! [`order::OrderBy::is_allowed`]). The storage layer renders the resulting
//! descriptors into its own dialect; query text only ever travels through
//! parameter binding.

pub mod order;
pub mod pagination;
pub mod search;

pub use order::{OrderBy, OrderDirection, OrderPath};
pub use pagination::{Page, PageMeta, PageParams, PageWindow};
pub use search::{
    Condition, FieldTarget, FilterExpr, Operator, SearchConfig, SearchMode, SearchParams,
    SearchType, SearchableField,
};
