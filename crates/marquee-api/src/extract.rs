//! Wrappers over axum's extractors whose rejections use the JSON envelope.

use axum::extract::{FromRequest, FromRequestParts};
use marquee_core::query::QueryParams;
use serde::Deserialize;

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Body<T>(pub T);

/// A single path segment, e.g. an id.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Segment<T>(pub T);

/// The raw query string as a [`QueryParams`] map.
#[derive(Debug, Deserialize, FromRequestParts)]
#[serde(transparent)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Params(pub QueryParams);
