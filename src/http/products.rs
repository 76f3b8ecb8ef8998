//! Product endpoints.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::domain::product::{self, NewProduct, ProductUpdate};
use crate::domain::{ImageRef, ProductStatus};
use crate::error::{ApiError, ApiResult};
use crate::images::{self, ImageStore};
use crate::store::{CatalogStore, ProductFilter, ProductSort};

use super::forms::{ProductForm, UploadedFile};
use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort: Option<String>,
}

/// `GET /api/products`: active products with filters and a free-text sort
/// string (`-createdAt` style).
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<Json<Value>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).max(1);
    let result = state
        .store
        .list_products(&ProductFilter {
            page,
            limit,
            category_name: query.category.filter(|c| !c.trim().is_empty()),
            featured: query.featured,
            search: query.search.filter(|s| !s.trim().is_empty()),
            min_price: query.min_price,
            max_price: query.max_price,
            sort: query
                .sort
                .as_deref()
                .map(ProductSort::parse)
                .unwrap_or_default(),
        })
        .await?;

    let pages = if result.total == 0 {
        0
    } else {
        (result.total + limit - 1) / limit
    };
    Ok(Json(json!({
        "success": true,
        "count": result.products.len(),
        "total": result.total,
        "totalActive": result.total_active,
        "page": page,
        "pages": pages,
        "products": result.products,
    })))
}

#[derive(Debug, Deserialize)]
pub struct NewArrivalsQuery {
    pub limit: Option<i64>,
}

/// `GET /api/products/new-arrivals`.
pub async fn new_arrivals(
    State(state): State<AppState>,
    Query(query): Query<NewArrivalsQuery>,
) -> ApiResult<Json<Value>> {
    let products = state
        .store
        .newest_products(query.limit.unwrap_or(6).max(1))
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": products.len(),
        "products": products,
    })))
}

/// `GET /api/products/:id`.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_product_id(&id)?;
    let product = state
        .store
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(json!({ "success": true, "product": product })))
}

/// `POST /api/products`: admin, multipart with `images` files. Individual
/// upload failures are logged and skipped; the product is created with
/// whatever uploaded cleanly.
pub async fn create_product(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let form = ProductForm::parse(multipart).await?;

    let name = required_text(form.name, "Product name is required")?;
    let description = required_text(form.description, "Product description is required")?;
    validate_lengths(&name, &description)?;
    let price = form
        .price
        .ok_or_else(|| ApiError::validation("Product price is required"))?;
    if price < 0 {
        return Err(ApiError::validation("Product price cannot be negative"));
    }
    let category_id = form
        .category
        .ok_or_else(|| ApiError::validation("Product category is required"))?;
    state
        .store
        .get_category(category_id)
        .await?
        .ok_or_else(|| ApiError::validation("Category not found"))?;

    let images = upload_images(state.images.as_ref(), &form.images, &name).await;

    let product = state
        .store
        .insert_product(NewProduct {
            name,
            description,
            price,
            discount_percent: form.discount_percent.unwrap_or(0.0),
            category_id,
            images,
            quantity: form.quantity.unwrap_or(0),
            status: ProductStatus::Active,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Product created successfully",
            "product": product,
        })),
    ))
}

/// `PUT /api/products/:id`: admin; deletes the images named in
/// `imagesToDelete` (best-effort) and appends new uploads.
pub async fn update_product(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let id = parse_product_id(&id)?;
    let form = ProductForm::parse(multipart).await?;

    let current = state
        .store
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    if let Some(category_id) = form.category {
        state
            .store
            .get_category(category_id)
            .await?
            .ok_or_else(|| ApiError::validation("Category not found"))?;
    }

    let name = form.name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
    let description = form
        .description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty());
    validate_lengths(
        name.as_deref().unwrap_or(&current.name),
        description.as_deref().unwrap_or(&current.description),
    )?;
    if form.price.map(|p| p < 0).unwrap_or(false) {
        return Err(ApiError::validation("Product price cannot be negative"));
    }

    let mut updated_images = current.images.clone();
    if !form.images_to_delete.is_empty() {
        for public_id in &form.images_to_delete {
            images::delete_best_effort(state.images.as_ref(), public_id).await;
        }
        updated_images.retain(|img| !form.images_to_delete.contains(&img.public_id));
    }
    let alt = name.as_deref().unwrap_or(&current.name);
    updated_images.extend(upload_images(state.images.as_ref(), &form.images, alt).await);
    let images_changed =
        !form.images.is_empty() || !form.images_to_delete.is_empty();

    let product = state
        .store
        .update_product(
            id,
            ProductUpdate {
                name,
                description,
                price: form.price,
                discount_percent: form.discount_percent,
                category_id: form.category,
                status: form.status,
                images: images_changed.then_some(updated_images),
                quantity: form.quantity,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Product updated successfully",
        "product": product,
    })))
}

/// `DELETE /api/products/:id`: hard delete; kept orders keep their
/// quantities with the product reference nulled.
pub async fn delete_product(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_product_id(&id)?;
    if !state.store.delete_product(id).await? {
        return Err(ApiError::not_found("Product not found"));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Product deleted successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryRequest {
    pub quantity: i32,
}

/// `PATCH /api/products/:id/inventory`: admin overwrite of the stock
/// count; `inStock` follows through the centralized mutator.
pub async fn update_inventory(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateInventoryRequest>,
) -> ApiResult<Json<Value>> {
    let id = parse_product_id(&id)?;
    let product = state
        .store
        .set_product_quantity(id, req.quantity)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(json!({
        "success": true,
        "message": "Inventory updated successfully",
        "product": product,
    })))
}

async fn upload_images(
    store: &dyn ImageStore,
    files: &[UploadedFile],
    alt: &str,
) -> Vec<ImageRef> {
    let mut images = Vec::with_capacity(files.len());
    for file in files {
        match store.upload(&file.data, "products", &file.file_name).await {
            Ok(stored) => images.push(ImageRef {
                url: stored.url,
                alt: alt.to_owned(),
                public_id: stored.public_id,
            }),
            Err(err) => {
                tracing::error!(file = %file.file_name, error = %err, "image upload failed");
            }
        }
    }
    images
}

fn required_text(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(message))
}

fn validate_lengths(name: &str, description: &str) -> ApiResult<()> {
    if name.len() > product::NAME_MAX {
        return Err(ApiError::validation(
            "Product name cannot exceed 100 characters",
        ));
    }
    if description.len() > product::DESCRIPTION_MAX {
        return Err(ApiError::validation(
            "Product description cannot exceed 1000 characters",
        ));
    }
    Ok(())
}

fn parse_product_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Product not found"))
}
