use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::products;
use crate::models::order::OrderGroup;

pub mod migrator;
pub mod repositories;

pub use repositories::order::{MonthlyRevenue, StatsFilter, StatsReport, TopProduct};
pub use repositories::product::{ProductDelete, ProductPatch};
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        if !path_str.starts_with(":memory:") {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn product_repo(&self) -> repositories::product::ProductRepository {
        repositories::product::ProductRepository::new(self.conn.clone())
    }

    fn order_repo(&self) -> repositories::order::OrderRepository {
        repositories::order::OrderRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    pub async fn list_products(&self) -> Result<Vec<products::Model>> {
        self.product_repo().list().await
    }

    pub async fn get_product(&self, id: i32) -> Result<Option<products::Model>> {
        self.product_repo().get(id).await
    }

    pub async fn create_product(
        &self,
        name: &str,
        price: f64,
        quantity: i32,
        description: Option<String>,
        image_url: Option<String>,
    ) -> Result<products::Model> {
        self.product_repo()
            .create(name, price, quantity, description, image_url)
            .await
    }

    pub async fn update_product(
        &self,
        id: i32,
        patch: ProductPatch,
    ) -> Result<Option<products::Model>> {
        self.product_repo().update(id, patch).await
    }

    pub async fn delete_product(&self, id: i32) -> Result<ProductDelete> {
        self.product_repo().delete(id).await
    }

    pub async fn list_orders(&self) -> Result<Vec<OrderGroup>> {
        self.order_repo().list_grouped().await
    }

    pub async fn get_order_by_code(&self, code: &str) -> Result<Option<OrderGroup>> {
        self.order_repo().get_by_code(code).await
    }

    pub async fn list_orders_for_user(&self, user_id: i32) -> Result<Vec<OrderGroup>> {
        self.order_repo().list_for_user(user_id).await
    }

    pub async fn get_order_for_user_by_code(
        &self,
        user_id: i32,
        code: &str,
    ) -> Result<Option<OrderGroup>> {
        self.order_repo().get_for_user_by_code(user_id, code).await
    }

    pub async fn mark_order_collected(&self, code: &str) -> Result<u64> {
        self.order_repo().mark_collected(code).await
    }

    pub async fn order_stats(&self, filter: &StatsFilter) -> Result<StatsReport> {
        self.order_repo().stats(filter).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(username, password, is_admin, config)
            .await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn revoke_token(&self, jti: &str, reason: &str) -> Result<()> {
        self.token_repo().revoke(jti, reason).await
    }

    pub async fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        self.token_repo().is_revoked(jti).await
    }
}
