//! Request extractors that answer malformed input with the JSON error envelope
//!
//! axum's own `Json`, `Query` and `Path` reject with plain-text bodies. These
//! wrappers route the rejection through [`AppError`] so a missing or mistyped
//! field comes back as `400 VALIDATION_ERROR` naming the field.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
