use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
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

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError(
            "Email and password are required".into(),
        ));
    }

    info!(email = %req.email, "registration requested");
    state.manager.register(&req.email, &req.password).await?;

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "message": "Verification code sent to email",
        "email": req.email,
    })))
}

pub async fn verify(
    req: web::Json<VerifyRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if req.email.is_empty() || req.code.is_empty() {
        return Err(AppError::ValidationError(
            "Email and code are required".into(),
        ));
    }

    state.manager.verify_code(&req.email, &req.code).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User successfully registered",
    })))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError(
            "Email and password are required".into(),
        ));
    }

    let pair = state.manager.login(&req.email, &req.password).await?;
    Ok(HttpResponse::Ok().json(pair))
}

pub async fn refresh(
    req: web::Json<RefreshRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if req.refresh_token.is_empty() {
        return Err(AppError::ValidationError("Refresh token is required".into()));
    }

    let pair = state.manager.refresh(&req.refresh_token).await?;
    Ok(HttpResponse::Ok().json(pair))
}

pub async fn logout(
    http_req: HttpRequest,
    body: Option<web::Json<LogoutRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    // Token comes from the body; a bearer header is the fallback source
    let token = body
        .and_then(|b| b.refresh_token.clone())
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&http_req));

    let token = token.ok_or_else(|| AppError::ValidationError("Refresh token is required".into()))?;

    state.manager.logout(&token).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully logged out",
    })))
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
