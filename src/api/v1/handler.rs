use super::error::*;
use crate::application_port::*;
use crate::domain_model::{AuthenticatedUser, UserChanges, UserId, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: ApiError) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

fn reply<T: Serialize>(data: T) -> warp::reply::Json {
    warp::reply::json(&ApiResponse::ok(data))
}

// region auth

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: AuthenticatedUser,
    pub tokens: AuthTokens,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

pub async fn register(
    body: RegisterRequest,
    ctx: RequestContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!(trace_id = %ctx.trace_id, "registering new user");

    let register_input = RegisterInput {
        name: body.name,
        email: body.email.clone(),
        password: body.password.clone(),
    };
    auth_service
        .register(register_input)
        .await
        .map_err(rejection)?;

    // A fresh account is logged in straight away.
    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let login_result = auth_service.login(login_input).await.map_err(rejection)?;

    Ok(reply(AuthResponse {
        user: login_result.user,
        tokens: login_result.tokens,
    }))
}

pub async fn login(
    body: LoginRequest,
    ctx: RequestContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!(trace_id = %ctx.trace_id, "login attempt");

    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let login_result = auth_service.login(login_input).await.map_err(rejection)?;

    info!(trace_id = %ctx.trace_id, user_id = %login_result.user.id, "login succeeded");
    Ok(reply(AuthResponse {
        user: login_result.user,
        tokens: login_result.tokens,
    }))
}

pub async fn refresh(
    body: RefreshRequest,
    ctx: RequestContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!(trace_id = %ctx.trace_id, "refreshing tokens");

    let tokens = auth_service
        .refresh(&body.refresh_token)
        .await
        .map_err(rejection)?;

    Ok(reply(tokens))
}

pub async fn logout(
    ctx: RequestContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = ctx.require_authenticated().map_err(rejection)?.id;
    let token = ctx
        .bearer_token
        .as_deref()
        .ok_or(AuthError::Unauthenticated)
        .map_err(rejection)?;

    info!(trace_id = %ctx.trace_id, %user_id, "logging out");
    auth_service
        .logout(user_id, token)
        .await
        .map_err(rejection)?;

    Ok(reply(LogoutResponse { logged_out: true }))
}

// endregion

// region users

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub async fn me(
    ctx: RequestContext,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service.me(&ctx).await.map_err(rejection)?;
    Ok(reply(user))
}

pub async fn list_users(
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let users = user_service.list_users().await.map_err(rejection)?;
    Ok(reply(users))
}

pub async fn get_user(
    user_id: i64,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user: Option<UserProfile> = user_service
        .get_user(UserId(user_id))
        .await
        .map_err(rejection)?;
    Ok(reply(user))
}

pub async fn create_user(
    body: CreateUserRequest,
    ctx: RequestContext,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let request = RegisterInput {
        name: body.name,
        email: body.email,
        password: body.password,
    };
    let user = user_service
        .create_user(&ctx, request)
        .await
        .map_err(rejection)?;
    Ok(reply(user))
}

pub async fn update_user(
    user_id: i64,
    body: UpdateUserRequest,
    ctx: RequestContext,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let changes = UserChanges {
        name: body.name,
        email: body.email,
    };
    let user = user_service
        .update_user(&ctx, UserId(user_id), changes)
        .await
        .map_err(rejection)?;
    Ok(reply(user))
}

pub async fn delete_user(
    user_id: i64,
    ctx: RequestContext,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .delete_user(&ctx, UserId(user_id))
        .await
        .map_err(rejection)?;
    Ok(reply(user))
}

// endregion
