use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::{orders, products};

/// Partial update; only provided fields are written.
#[derive(Debug, Default, Clone)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Outcome of a delete attempt, so the API layer can pick the right status.
#[derive(Debug, PartialEq, Eq)]
pub enum ProductDelete {
    Deleted,
    NotFound,
    /// Refused: order rows still reference the product.
    HasOrders,
}

pub struct ProductRepository {
    conn: DatabaseConnection,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<products::Model>> {
        products::Entity::find()
            .order_by_asc(products::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list products")
    }

    pub async fn get(&self, id: i32) -> Result<Option<products::Model>> {
        products::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query product")
    }

    pub async fn create(
        &self,
        name: &str,
        price: f64,
        quantity: i32,
        description: Option<String>,
        image_url: Option<String>,
    ) -> Result<products::Model> {
        let active = products::ActiveModel {
            name: Set(name.to_string()),
            price: Set(price),
            quantity: Set(quantity),
            description: Set(description),
            image_url: Set(image_url),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert product")?;

        info!("Created product: {} (ID: {})", model.name, model.id);
        Ok(model)
    }

    pub async fn update(&self, id: i32, patch: ProductPatch) -> Result<Option<products::Model>> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: products::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(price) = patch.price {
            active.price = Set(price);
        }
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(image_url) = patch.image_url {
            active.image_url = Set(Some(image_url));
        }

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update product")?;

        Ok(Some(model))
    }

    /// Delete a product unless order rows still reference it.
    pub async fn delete(&self, id: i32) -> Result<ProductDelete> {
        if self.get(id).await?.is_none() {
            return Ok(ProductDelete::NotFound);
        }

        let referenced = orders::Entity::find()
            .filter(orders::Column::ProductId.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to check product references")?
            .is_some();

        if referenced {
            return Ok(ProductDelete::HasOrders);
        }

        products::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete product")?;

        info!("Deleted product with ID: {}", id);
        Ok(ProductDelete::Deleted)
    }
}
