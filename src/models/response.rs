// src/models/response.rs

use axum::Json;
use serde::Serialize;

/// Success envelope shared by every endpoint: `{"success": true, "data": ...}`.
/// Errors use the same shape with `success: false` (see `AppError`).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}
