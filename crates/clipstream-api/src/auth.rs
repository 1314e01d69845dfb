//! Caller identity extraction.
//!
//! Authentication itself is an external collaborator; this module is the
//! integration seam. The gateway in front of this service authenticates the
//! caller and forwards the owner id in `X-Owner-Id`. Requests without the
//! header are rejected as unauthenticated.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use clipstream_core::AppError;
use uuid::Uuid;

use crate::error::HttpAppError;

pub const OWNER_ID_HEADER: &str = "x-owner-id";

/// Authenticated owner of the request.
#[derive(Debug, Clone, Copy)]
pub struct OwnerId(pub Uuid);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "Missing X-Owner-Id header".to_string(),
                ))
            })?;

        let owner_id = raw.parse::<Uuid>().map_err(|_| {
            HttpAppError(AppError::Unauthorized(
                "X-Owner-Id is not a valid UUID".to_string(),
            ))
        })?;

        Ok(OwnerId(owner_id))
    }
}
