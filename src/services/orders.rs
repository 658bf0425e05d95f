use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::db::Store;
use crate::entities::{orders, products};
use crate::models::order::{OrderGroup, round2};

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LENGTH: usize = 6;
const CODE_MAX_ATTEMPTS: usize = 16;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Quantity must be positive for product {product_id}")]
    InvalidQuantity { product_id: i32 },

    #[error("Product {0} not found")]
    ProductNotFound(i32),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i32,
        requested: i32,
        available: i32,
    },

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    pub product_id: i32,
    pub quantity: i32,
}

pub struct OrderService {
    store: Store,
}

impl OrderService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Place an order for one or more products.
    ///
    /// The whole checkout runs in a single transaction: stock checks,
    /// stock decrements and item inserts either all land or none do. Every
    /// item row snapshots the product price at purchase time.
    pub async fn checkout(
        &self,
        user_id: Option<i32>,
        items: &[OrderItemInput],
    ) -> Result<OrderGroup, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let txn = self.store.conn.begin().await?;

        let code = Self::unique_code(&txn).await?;
        let created_at = Utc::now().to_rfc3339();

        for item in items {
            if item.quantity <= 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id,
                });
            }

            let product = products::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or(OrderError::ProductNotFound(item.product_id))?;

            if product.quantity < item.quantity {
                return Err(OrderError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.quantity,
                });
            }

            let unit_price = round2(product.price);
            let line_total = round2(product.price * f64::from(item.quantity));
            let remaining = product.quantity - item.quantity;

            let mut active: products::ActiveModel = product.into();
            active.quantity = Set(remaining);
            active.update(&txn).await?;

            orders::ActiveModel {
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                code: Set(code.clone()),
                collected: Set(false),
                total_amount: Set(line_total),
                unit_price: Set(Some(unit_price)),
                line_total: Set(Some(line_total)),
                user_id: Set(user_id),
                created_at: Set(created_at.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!("Created order {} with {} item(s)", code, items.len());

        self.store
            .get_order_by_code(&code)
            .await?
            .ok_or_else(|| OrderError::Internal(anyhow::anyhow!("Order {code} vanished after commit")))
    }

    /// Generate a pickup code not currently in use. Codes are checked
    /// inside the checkout transaction, so a winning insert makes the code
    /// unavailable to concurrent checkouts.
    async fn unique_code(txn: &sea_orm::DatabaseTransaction) -> Result<String, OrderError> {
        for _ in 0..CODE_MAX_ATTEMPTS {
            let candidate = generate_code();

            let taken = orders::Entity::find()
                .filter(orders::Column::Code.eq(candidate.clone()))
                .one(txn)
                .await?
                .is_some();

            if !taken {
                return Ok(candidate);
            }
        }

        Err(OrderError::Internal(anyhow::anyhow!(
            "Could not find a free pickup code after {CODE_MAX_ATTEMPTS} attempts"
        )))
    }
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}
