//! Request body extractors

use crate::error::ApiError;
use axum::extract::FromRequest;

/// `Json<T>` whose rejections are reported as [`ApiError`] bodies
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
