//! Auth and user-management endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{self, AdminUser, AuthUser};
use crate::domain::user::NewUser;
use crate::domain::Role;
use crate::error::{ApiError, ApiResult};
use crate::store::UserStore;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// `POST /api/auth/register`.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = required(req.name, "Name is required")?;
    let email = required(req.email, "Email is required")?;
    let password = required(req.password, "Password is required")?;

    let user = state
        .store
        .insert_user(NewUser {
            name,
            email,
            password_hash: auth::hash_password(&password)?,
            role: req.role.unwrap_or_default(),
        })
        .await
        .map_err(ApiError::from)?;

    let access_token = state.auth.issue_access_token(user.id, user.role)?;
    let refresh_token = state.auth.issue_refresh_token(user.id, user.role)?;
    state
        .store
        .set_refresh_token(user.id, Some(&refresh_token))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": {
                "user": user,
                "accessToken": access_token,
                "refreshToken": refresh_token,
            },
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `POST /api/auth/login`.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(ApiError::validation("Please provide email and password"));
    };

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_owned());
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(invalid)?;
    if !auth::verify_password(&password, &user.password_hash) {
        return Err(invalid());
    }

    let access_token = state.auth.issue_access_token(user.id, user.role)?;
    let refresh_token = state.auth.issue_refresh_token(user.id, user.role)?;
    state
        .store
        .set_refresh_token(user.id, Some(&refresh_token))
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "data": {
            "user": user,
            "accessToken": access_token,
            "refreshToken": refresh_token,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// `POST /api/auth/refresh-token`: the presented token must verify and
/// match the one persisted on the account.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    let token = req
        .refresh_token
        .ok_or_else(|| ApiError::Unauthorized("Refresh token is required".to_owned()))?;
    let invalid = || ApiError::Unauthorized("Invalid refresh token".to_owned());

    let claims = state.auth.verify_refresh_token(&token).map_err(|_| invalid())?;
    let user = state
        .store
        .get_user(claims.sub)
        .await
        .map_err(|_| invalid())?
        .filter(|u| u.refresh_token.as_deref() == Some(token.as_str()))
        .ok_or_else(invalid)?;

    let access_token = state.auth.issue_access_token(user.id, user.role)?;

    Ok(Json(json!({
        "success": true,
        "message": "Token refreshed successfully",
        "data": {
            "user": user,
            "accessToken": access_token,
        },
    })))
}

/// `POST /api/auth/logout`: revokes the persisted refresh token.
pub async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    state.store.set_refresh_token(user.id, None).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Logout successful",
    })))
}

/// `GET /api/auth/profile`.
pub async fn get_profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let user = state.store.get_user(user.id).await?;
    Ok(Json(json!({
        "success": true,
        "data": { "user": user },
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// `PUT /api/auth/profile`.
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .store
        .update_profile(user.id, req.name, req.email)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": { "user": user },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /api/auth/all`: admin, active accounts only.
pub async fn list_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Value>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).max(1);
    let (users, total) = state.store.list_active_users(page, limit).await?;
    let pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
    Ok(Json(json!({
        "success": true,
        "data": {
            "users": users,
            "pagination": {
                "page": page,
                "limit": limit,
                "total": total,
                "pages": pages,
            },
        },
    })))
}

/// `DELETE /api/auth/:id`: admin soft delete.
pub async fn delete_user(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("User not found"))?;
    state.store.deactivate_user(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}

fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(message))
}
