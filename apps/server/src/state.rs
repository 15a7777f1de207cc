//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::{FriendshipRepository, UserRepository};
use crate::services::{FriendshipService, UserService};
use crate::Result;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: PgPool,
    pub users: Arc<UserService>,
    pub friendships: Arc<FriendshipService>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let db_pool = PgPoolOptions::new()
            .min_connections(config.database.pool_min_size)
            .max_connections(config.database.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
            .connect(&config.database.url)
            .await?;

        if config.database.run_migrations {
            sqlx::migrate!("./migrations").run(&db_pool).await.map_err(
                |err| crate::Error::Internal(format!("migration failed: {err}")),
            )?;
            tracing::info!("database migrations applied");
        }

        let user_repo = UserRepository::new(db_pool.clone());
        let users = Arc::new(UserService::new(user_repo.clone()));
        let friendships = Arc::new(FriendshipService::new(
            FriendshipRepository::new(db_pool.clone()),
            Arc::new(user_repo),
        ));

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            users,
            friendships,
        })
    }
}
