//! Category endpoints.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::domain::category::{self, CategoryUpdate, NewCategory};
use crate::domain::ImageRef;
use crate::error::{ApiError, ApiResult};
use crate::images::{self, ImageStore};
use crate::store::CatalogStore;

use super::forms::CategoryForm;
use super::AppState;

/// `GET /api/categories`: active categories for the storefront.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let categories = state.store.list_active_categories().await?;
    Ok(Json(json!({
        "success": true,
        "count": categories.len(),
        "categories": categories,
    })))
}

/// `GET /api/categories/:id`: one category plus its active products.
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_category_id(&id)?;
    let category = state
        .store
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    let products = state.store.products_in_category(id).await?;

    let mut category_json = serde_json::to_value(&category)
        .map_err(|e| ApiError::Internal(e.into()))?;
    if let Some(obj) = category_json.as_object_mut() {
        obj.insert("productsCount".to_owned(), json!(products.len()));
    }

    Ok(Json(json!({
        "success": true,
        "category": category_json,
        "products": products,
    })))
}

/// `POST /api/categories`: admin, multipart with a single `image` file.
pub async fn create_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let form = CategoryForm::parse(multipart).await?;

    let name = form
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("Category name is required"))?
        .to_owned();
    validate_lengths(&name, form.description.as_deref())?;

    if state
        .store
        .find_category_by_name(&name, None)
        .await?
        .is_some()
    {
        return Err(ApiError::validation(
            "Category with this name already exists",
        ));
    }

    let file = form
        .image
        .ok_or_else(|| ApiError::validation("Image is required"))?;
    let stored = state
        .images
        .upload(&file.data, "categories", &file.file_name)
        .await
        .map_err(|e| ApiError::validation(format!("Error uploading image: {e}")))?;
    let image = ImageRef {
        url: stored.url,
        alt: name.clone(),
        public_id: stored.public_id,
    };

    let created = state
        .store
        .insert_category(NewCategory {
            name,
            description: form
                .description
                .map(|d| d.trim().to_owned())
                .unwrap_or_default(),
            image: Some(image),
            is_active: form.is_active.unwrap_or(true),
            featured: form.featured.unwrap_or(false),
            display_order: form.display_order.unwrap_or(0),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Category created successfully",
            "category": created,
        })),
    ))
}

/// `PUT /api/categories/:id`: admin; a replacement image deletes the old
/// stored object best-effort.
pub async fn update_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let id = parse_category_id(&id)?;
    let form = CategoryForm::parse(multipart).await?;

    let current = state
        .store
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let name = form
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned);
    if let Some(name) = &name {
        validate_lengths(name, form.description.as_deref())?;
        if name != &current.name
            && state
                .store
                .find_category_by_name(name, Some(id))
                .await?
                .is_some()
        {
            return Err(ApiError::validation(
                "Category with this name already exists",
            ));
        }
    } else {
        validate_lengths(&current.name, form.description.as_deref())?;
    }

    let mut image_update: Option<Option<ImageRef>> = None;
    if form.remove_image {
        if let Some(image) = &current.image {
            images::delete_best_effort(state.images.as_ref(), &image.public_id).await;
        }
        image_update = Some(None);
    }
    if let Some(file) = form.image {
        if !form.remove_image {
            if let Some(image) = &current.image {
                images::delete_best_effort(state.images.as_ref(), &image.public_id).await;
            }
        }
        let stored = state
            .images
            .upload(&file.data, "categories", &file.file_name)
            .await
            .map_err(|e| ApiError::validation(format!("Error uploading new image: {e}")))?;
        image_update = Some(Some(ImageRef {
            url: stored.url,
            alt: name.clone().unwrap_or_else(|| current.name.clone()),
            public_id: stored.public_id,
        }));
    }

    let updated = state
        .store
        .update_category(
            id,
            CategoryUpdate {
                name,
                description: form.description.map(|d| d.trim().to_owned()),
                is_active: form.is_active,
                featured: form.featured,
                display_order: form.display_order,
                image: image_update,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Category updated successfully",
        "category": updated,
    })))
}

/// `DELETE /api/categories/:id`: blocked while products still reference
/// the category.
pub async fn delete_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_category_id(&id)?;
    state
        .store
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let products = state.store.count_products_in_category(id).await?;
    if products > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete category. There are {products} products associated with it."
        )));
    }

    state.store.delete_category(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Category deleted successfully",
    })))
}

fn validate_lengths(name: &str, description: Option<&str>) -> ApiResult<()> {
    if name.len() > category::NAME_MAX {
        return Err(ApiError::validation(
            "Category name cannot exceed 50 characters",
        ));
    }
    if description.map(|d| d.trim().len()).unwrap_or(0) > category::DESCRIPTION_MAX {
        return Err(ApiError::validation(
            "Description cannot exceed 500 characters",
        ));
    }
    Ok(())
}

fn parse_category_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Category not found"))
}
