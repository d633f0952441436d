use super::parse_code;
use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, CreateUrlResponse, DeleteUrlResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::time::Duration;
use wormhole_core::{ExpirationPolicy, ShortenParams};

pub async fn create_url_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateUrlResponse>)> {
    let Json(request) = request.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut params = ShortenParams::new(request.original_url);
    if let Some(alias) = request.custom_alias {
        params = params.with_alias(alias);
    }
    match request.expire_in_seconds {
        Some(0) => {
            return Err(AppError::BadRequest(
                "expire_in_seconds must be positive".to_string(),
            ))
        }
        Some(seconds) => {
            params = params.with_expiration(ExpirationPolicy::AfterDuration(
                Duration::from_secs(seconds),
            ));
        }
        None => {}
    }

    let link = state.shortener.shorten(params).await?;
    let response = CreateUrlResponse {
        success: true,
        short_url: link.short_code.to_url(state.base_url()),
        short_code: link.short_code.to_string(),
        original_url: link.original_url,
        created_at: link.created_at,
        expire_at: link.expire_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn delete_url_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteUrlResponse>> {
    let code = parse_code(short_code)?;

    state.shortener.delete(&code).await?;
    state.redirector.invalidate(&code).await;

    Ok(Json(DeleteUrlResponse {
        success: true,
        message: format!("link '{code}' deleted"),
    }))
}
