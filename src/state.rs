use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, ImageService, OrderService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<AuthService>,

    pub order_service: Arc<OrderService>,

    pub image_service: Arc<ImageService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        seed_admin_user(&store, &config).await?;

        let auth_service = Arc::new(AuthService::new(
            store.clone(),
            config.auth.clone(),
            config.security.clone(),
        ));
        let order_service = Arc::new(OrderService::new(store.clone()));
        let image_service = Arc::new(ImageService::new(config.general.images_path.clone()));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            order_service,
            image_service,
        })
    }
}

/// Create the admin account on first startup so the API is usable
/// before anyone registers.
async fn seed_admin_user(store: &Store, config: &Config) -> anyhow::Result<()> {
    let username = &config.auth.admin_username;

    if store.get_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    store
        .create_user(username, &config.auth.admin_password, true, &config.security)
        .await?;
    info!("Seeded admin user: {}", username);

    if config.auth.admin_password == crate::config::AuthConfig::default().admin_password {
        warn!("Admin account uses the default password; change it before exposing the server");
    }

    Ok(())
}
