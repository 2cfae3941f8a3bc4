//! Uploader identity extraction.
//!
//! Authentication itself is handled by an upstream gateway; it forwards the
//! authenticated user as `x-user-id` (and optionally `x-user-email` for
//! notifications). This extractor stands in for that session middleware.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use abp_core::AppError;

use crate::error::HttpAppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The authenticated uploader of the current request.
#[derive(Debug, Clone)]
pub struct UploaderContext {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl<S> FromRequestParts<S> for UploaderContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "Missing x-user-id header".to_string(),
                ))
            })?;

        let user_id = Uuid::parse_str(user_id).map_err(|_| {
            HttpAppError(AppError::Unauthorized(
                "Invalid x-user-id header".to_string(),
            ))
        })?;

        let email = parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(UploaderContext { user_id, email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<UploaderContext, HttpAppError> {
        let (mut parts, _) = request.into_parts();
        UploaderContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn valid_user_id_is_extracted() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_EMAIL_HEADER, "uploader@example.com")
            .body(())
            .unwrap();
        let ctx = extract(request).await.unwrap();
        assert_eq!(ctx.user_id, id);
        assert_eq!(ctx.email.as_deref(), Some("uploader@example.com"));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        let err = extract(request).await.unwrap_err();
        assert_eq!(abp_core::ErrorMetadata::http_status_code(&err.0), 401);
    }

    #[tokio::test]
    async fn malformed_user_id_is_unauthorized() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        let err = extract(request).await.unwrap_err();
        assert_eq!(abp_core::ErrorMetadata::http_status_code(&err.0), 401);
    }
}
