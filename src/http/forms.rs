//! Multipart form parsing.
//!
//! Admin catalog forms arrive as multipart bodies: image files plus string
//! form fields ("true", "499", ...). Everything is converted into typed
//! values here, before any handler logic runs; a bad field is a structured
//! 400, never a stray parse panic deeper in.

use axum::extract::multipart::{Field, Multipart};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::ProductStatus;
use crate::error::{ApiError, ApiResult};

pub struct UploadedFile {
    pub data: Vec<u8>,
    pub file_name: String,
}

async fn file(field: Field<'_>) -> ApiResult<UploadedFile> {
    let file_name = field.file_name().unwrap_or("image").to_owned();
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::validation(format!("Error reading uploaded file: {e}")))?
        .to_vec();
    Ok(UploadedFile { data, file_name })
}

async fn text(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Error reading form field: {e}")))
}

fn parse_field<T: FromStr>(name: &str, raw: &str) -> ApiResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::validation(format!("Invalid value for field {name}")))
}

#[derive(Default)]
pub struct CategoryForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
    pub display_order: Option<i32>,
    pub remove_image: bool,
    pub image: Option<UploadedFile>,
}

impl CategoryForm {
    pub async fn parse(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "image" => form.image = Some(file(field).await?),
                "name" => form.name = Some(text(field).await?),
                "description" => form.description = Some(text(field).await?),
                "isActive" => form.is_active = Some(parse_field("isActive", &text(field).await?)?),
                "featured" => form.featured = Some(parse_field("featured", &text(field).await?)?),
                "displayOrder" => {
                    form.display_order = Some(parse_field("displayOrder", &text(field).await?)?)
                }
                "removeImage" => form.remove_image = text(field).await?.trim() == "true",
                _ => {}
            }
        }
        Ok(form)
    }
}

#[derive(Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<Uuid>,
    pub discount_percent: Option<f64>,
    pub quantity: Option<i32>,
    pub status: Option<ProductStatus>,
    pub images_to_delete: Vec<String>,
    pub images: Vec<UploadedFile>,
}

impl ProductForm {
    pub async fn parse(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "images" => form.images.push(file(field).await?),
                "name" => form.name = Some(text(field).await?),
                "description" => form.description = Some(text(field).await?),
                "price" => form.price = Some(parse_field("price", &text(field).await?)?),
                "category" => {
                    let raw = text(field).await?;
                    form.category = Some(
                        Uuid::parse_str(raw.trim())
                            .map_err(|_| ApiError::validation("Invalid value for field category"))?,
                    );
                }
                "discountPercent" => {
                    form.discount_percent =
                        Some(parse_field("discountPercent", &text(field).await?)?)
                }
                "quantity" => form.quantity = Some(parse_field("quantity", &text(field).await?)?),
                "status" => {
                    let raw = text(field).await?;
                    form.status = Some(
                        raw.trim()
                            .parse()
                            .map_err(|_| ApiError::validation("Invalid value for field status"))?,
                    );
                }
                "imagesToDelete" => {
                    let raw = text(field).await?;
                    form.images_to_delete = serde_json::from_str(&raw).map_err(|_| {
                        ApiError::validation("Invalid value for field imagesToDelete")
                    })?;
                }
                _ => {}
            }
        }
        Ok(form)
    }
}
