//! Friendship repository.
//!
//! Row-level mutations take a [`PgConnection`] so the service can run every
//! decision and its write inside one transaction, with the pair row locked
//! against concurrent senders. A unique index on the unordered pair backs the
//! one-row-per-pair rule at the storage level.

use chrono::{DateTime, Utc};
use courtside_query::pagination::PageWindow;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{FriendRequestView, Friendship, FriendshipStatus, UserSummary};
use crate::Result;

const FRIENDSHIP_COLUMNS: &str =
    "f.id, f.requester_id, f.receiver_id, f.status, f.created_at, f.updated_at";

#[derive(Debug, FromRow)]
struct FriendRequestRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    requester_id: Uuid,
    first_name: String,
    last_name: String,
    avatar_url: Option<String>,
    email: String,
}

impl From<FriendRequestRow> for FriendRequestView {
    fn from(row: FriendRequestRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            requester: UserSummary {
                id: row.requester_id,
                first_name: row.first_name,
                last_name: row.last_name,
                avatar_url: row.avatar_url,
                email: row.email,
            },
        }
    }
}

#[derive(Clone)]
pub struct FriendshipRepository {
    pool: PgPool,
}

impl FriendshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The relationship row between two users, regardless of direction.
    pub async fn find_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Friendship>> {
        let sql = format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships f \
             WHERE (f.requester_id = $1 AND f.receiver_id = $2) \
                OR (f.requester_id = $2 AND f.receiver_id = $1)"
        );
        let row = sqlx::query_as::<_, Friendship>(&sql)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Same lookup, but locks the row for the rest of the transaction.
    pub async fn find_pair_for_update(
        &self,
        conn: &mut PgConnection,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<Friendship>> {
        let sql = format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships f \
             WHERE (f.requester_id = $1 AND f.receiver_id = $2) \
                OR (f.requester_id = $2 AND f.receiver_id = $1) \
             FOR UPDATE"
        );
        let row = sqlx::query_as::<_, Friendship>(&sql)
            .bind(a)
            .bind(b)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Friendship>> {
        let sql =
            format!("SELECT {FRIENDSHIP_COLUMNS} FROM friendships f WHERE f.id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, Friendship>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        requester_id: Uuid,
        receiver_id: Uuid,
        status: FriendshipStatus,
    ) -> Result<Friendship> {
        let row = sqlx::query_as::<_, Friendship>(
            "INSERT INTO friendships (requester_id, receiver_id, status) \
             VALUES ($1, $2, $3) \
             RETURNING id, requester_id, receiver_id, status, created_at, updated_at",
        )
        .bind(requester_id)
        .bind(receiver_id)
        .bind(status)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: FriendshipStatus,
    ) -> Result<Friendship> {
        let row = sqlx::query_as::<_, Friendship>(
            "UPDATE friendships SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING id, requester_id, receiver_id, status, created_at, updated_at",
        )
        .bind(id)
        .bind(status)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// Rewrite an existing row as a block held by `blocker_id`. The blocker
    /// always becomes the requester so unblock authorization stays a simple
    /// role check.
    pub async fn force_block(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> Result<Friendship> {
        let row = sqlx::query_as::<_, Friendship>(
            "UPDATE friendships \
             SET requester_id = $2, receiver_id = $3, status = 'blocked', updated_at = now() \
             WHERE id = $1 \
             RETURNING id, requester_id, receiver_id, status, created_at, updated_at",
        )
        .bind(id)
        .bind(blocker_id)
        .bind(blocked_id)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM friendships WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// One page of a user's accepted friends, most recently accepted first.
    pub async fn list_friends(
        &self,
        user_id: Uuid,
        window: PageWindow,
    ) -> Result<(Vec<UserSummary>, i64)> {
        let items = sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.first_name, u.last_name, u.avatar_url, u.email \
             FROM friendships f \
             JOIN users u ON u.id = CASE \
                 WHEN f.requester_id = $1 THEN f.receiver_id \
                 ELSE f.requester_id \
             END \
             WHERE (f.requester_id = $1 OR f.receiver_id = $1) \
               AND f.status = 'accepted' \
               AND u.deleted_at IS NULL \
             ORDER BY f.updated_at DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) \
             FROM friendships f \
             JOIN users u ON u.id = CASE \
                 WHEN f.requester_id = $1 THEN f.receiver_id \
                 ELSE f.requester_id \
             END \
             WHERE (f.requester_id = $1 OR f.receiver_id = $1) \
               AND f.status = 'accepted' \
               AND u.deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }

    /// One page of pending requests addressed to `user_id`, newest first.
    pub async fn list_incoming(
        &self,
        user_id: Uuid,
        window: PageWindow,
    ) -> Result<(Vec<FriendRequestView>, i64)> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            "SELECT f.id, f.created_at, \
                    u.id AS requester_id, u.first_name, u.last_name, u.avatar_url, u.email \
             FROM friendships f \
             JOIN users u ON u.id = f.requester_id \
             WHERE f.receiver_id = $1 \
               AND f.status = 'pending' \
               AND u.deleted_at IS NULL \
             ORDER BY f.created_at DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) \
             FROM friendships f \
             JOIN users u ON u.id = f.requester_id \
             WHERE f.receiver_id = $1 \
               AND f.status = 'pending' \
               AND u.deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(FriendRequestView::from).collect(), total))
    }
}
