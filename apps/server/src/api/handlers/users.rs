//! User directory handlers.

use axum::extract::{Path, State};
use axum::Json;
use courtside_query::pagination::Page;
use uuid::Uuid;

use crate::api::extractors::{ListQuery, ValidatedQuery};
use crate::models::User;
use crate::state::AppState;
use crate::Result;

pub async fn list_users(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> Result<Json<Page<User>>> {
    let page = state
        .users
        .list(query.page_params(), query.order(), query.search())
        .await?;
    Ok(Json(page))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>> {
    Ok(Json(state.users.get(id).await?))
}
