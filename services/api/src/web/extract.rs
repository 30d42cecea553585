//! services/api/src/web/extract.rs
//!
//! Body and query extractors whose rejections go through `RouteError`, so a
//! malformed request still gets a JSON `{"error": ...}` body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::RouteError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(RouteError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(RouteError))]
pub struct QueryParams<T>(pub T);
