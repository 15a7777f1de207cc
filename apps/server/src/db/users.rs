//! User repository.

use async_trait::async_trait;
use courtside_query::{order::OrderBy, pagination::PageWindow, search::FilterExpr};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::render::{
    bind_query_as, bind_query_scalar, push_int, render_filter, render_order, ColumnMap,
};
use crate::db::traits::UserDirectory;
use crate::models::User;
use crate::Result;

const USER_COLUMNS: &str =
    "u.id, u.email, u.username, u.first_name, u.last_name, u.avatar_url, u.deleted_at, \
     u.created_at, u.updated_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Field paths the listing endpoint may search/order by, mapped to SQL.
    fn columns() -> ColumnMap {
        ColumnMap::new()
            .with("first_name", "u.first_name")
            .with("last_name", "u.last_name")
            .with("username", "u.username")
            .with("email", "u.email")
            .with("created_at", "u.created_at")
            .with("updated_at", "u.updated_at")
            .with(
                "friends._count",
                "(SELECT COUNT(*) FROM friendships f \
                 WHERE (f.requester_id = u.id OR f.receiver_id = u.id) \
                 AND f.status = 'accepted')",
            )
    }

    /// Fetch one page of live users plus the total matching count.
    ///
    /// The same rendered filter runs in both queries so items and total can
    /// never disagree about the predicate.
    pub async fn list(
        &self,
        filter: &FilterExpr,
        order: &OrderBy,
        window: PageWindow,
    ) -> Result<(Vec<User>, i64)> {
        let columns = Self::columns();
        let order_sql = render_order(order, &columns)?;

        let mut binds = Vec::new();
        let where_sql = match render_filter(filter, &columns, &mut binds)? {
            Some(predicate) => format!("WHERE u.deleted_at IS NULL AND {predicate}"),
            None => "WHERE u.deleted_at IS NULL".to_string(),
        };
        let limit_idx = push_int(&mut binds, window.limit);
        let offset_idx = push_int(&mut binds, window.offset);

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u {where_sql} \
             ORDER BY {order_sql} LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );
        let items = bind_query_as(sqlx::query_as::<_, User>(&sql), &binds)
            .fetch_all(&self.pool)
            .await?;

        let mut count_binds = Vec::new();
        let count_where = match render_filter(filter, &columns, &mut count_binds)? {
            Some(predicate) => format!("WHERE u.deleted_at IS NULL AND {predicate}"),
            None => "WHERE u.deleted_at IS NULL".to_string(),
        };
        let count_sql = format!("SELECT COUNT(*) FROM users u {count_where}");
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), &count_binds)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1 AND u.deleted_at IS NULL");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserRepository::find_by_id(self, id).await
    }
}
