//! User directory service.

use courtside_query::{
    order::OrderBy,
    pagination::{Page, PageParams},
    search::{SearchConfig, SearchParams, SearchableField},
};
use uuid::Uuid;

use crate::db::UserRepository;
use crate::models::User;
use crate::{Error, Result};

/// Top-level fields the listing endpoint may order by.
const ORDERABLE_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "username",
    "email",
    "created_at",
    "updated_at",
];

/// Relations usable in order paths. `friends` only supports `_count`.
const ORDERABLE_RELATIONS: &[(&str, &[&str])] = &[("friends", &[])];

pub struct UserService {
    users: UserRepository,
}

impl UserService {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    fn search_config() -> SearchConfig {
        SearchConfig::new([
            SearchableField::new("first_name"),
            SearchableField::new("last_name"),
            SearchableField::new("username"),
        ])
    }

    pub async fn list(
        &self,
        page: PageParams,
        order: OrderBy,
        search: SearchParams,
    ) -> Result<Page<User>> {
        if !order.is_allowed(ORDERABLE_FIELDS, ORDERABLE_RELATIONS) {
            return Err(Error::validation(format!(
                "Cannot order by field '{}'",
                order.path.canonical()
            )));
        }

        let filter = search.build_where(&Self::search_config());
        let (items, total) = self.users.list(&filter, &order, page.window()).await?;
        Ok(page.paginate(items, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))
    }
}
