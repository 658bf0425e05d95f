use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, ProductDto};
use crate::db::{ProductDelete, ProductPatch};

/// Product fields collected from a multipart form. Creation requires
/// name/price/quantity; updates take any subset.
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    price: Option<f64>,
    quantity: Option<i32>,
    description: Option<String>,
    image_url: Option<String>,
}

async fn parse_product_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };

        match name.as_str() {
            "name" => {
                form.name = Some(read_text(field).await?);
            }
            "price" => {
                let text = read_text(field).await?;
                form.price = Some(
                    text.parse()
                        .map_err(|_| ApiError::validation("Price must be a number"))?,
                );
            }
            "quantity" => {
                let text = read_text(field).await?;
                form.quantity = Some(
                    text.parse()
                        .map_err(|_| ApiError::validation("Quantity must be an integer"))?,
                );
            }
            "description" => {
                form.description = Some(read_text(field).await?);
            }
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read image: {e}")))?;

                if !bytes.is_empty() {
                    let url = state.image_service().save_upload(&filename, &bytes).await?;
                    form.image_url = Some(url);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid form field: {e}")))
}

/// GET /products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ProductDto>>>, ApiError> {
    let products = state.store().list_products().await?;

    Ok(Json(ApiResponse::success(
        products.into_iter().map(ProductDto::from).collect(),
    )))
}

/// GET /products/{id}
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    let product = state
        .store()
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    Ok(Json(ApiResponse::success(ProductDto::from(product))))
}

/// POST /products (admin)
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    let form = parse_product_form(&state, multipart).await?;

    let name = form
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Name is required"))?;
    let price = form
        .price
        .ok_or_else(|| ApiError::validation("Price is required"))?;
    let quantity = form
        .quantity
        .ok_or_else(|| ApiError::validation("Quantity is required"))?;

    if price < 0.0 {
        return Err(ApiError::validation("Price cannot be negative"));
    }
    if quantity < 0 {
        return Err(ApiError::validation("Quantity cannot be negative"));
    }

    let product = state
        .store()
        .create_product(
            name.trim(),
            price,
            quantity,
            form.description,
            form.image_url,
        )
        .await?;

    Ok(Json(ApiResponse::success(ProductDto::from(product))))
}

/// PUT /products/{id} (admin)
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    let form = parse_product_form(&state, multipart).await?;

    if let Some(price) = form.price
        && price < 0.0
    {
        return Err(ApiError::validation("Price cannot be negative"));
    }
    if let Some(quantity) = form.quantity
        && quantity < 0
    {
        return Err(ApiError::validation("Quantity cannot be negative"));
    }

    let patch = ProductPatch {
        name: form.name.filter(|n| !n.trim().is_empty()),
        price: form.price,
        quantity: form.quantity,
        description: form.description,
        image_url: form.image_url,
    };

    let product = state
        .store()
        .update_product(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    Ok(Json(ApiResponse::success(ProductDto::from(product))))
}

/// DELETE /products/{id} (admin)
/// Refused while order rows still reference the product; order history
/// keeps its pickup codes alive.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    match state.store().delete_product(id).await? {
        ProductDelete::Deleted => Ok(Json(ApiResponse::success(MessageResponse {
            message: format!("Product {id} deleted"),
        }))),
        ProductDelete::NotFound => Err(ApiError::not_found("Product", id)),
        ProductDelete::HasOrders => Err(ApiError::validation(
            "Cannot delete a product with existing orders",
        )),
    }
}
