use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::CurrentUser;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Sessions are terminated upstream; the gateway forwards the verified
/// identity in headers. A missing or malformed id is a 401.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(AppError::Unauthenticated)?;

        let email = parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(CurrentUser { id, email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(builder: axum::http::request::Builder) -> Result<CurrentUser, AppError> {
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_reads_identity_headers() {
        let id = Uuid::new_v4();
        let user = extract(
            Request::builder()
                .header(USER_ID_HEADER, id.to_string())
                .header(USER_EMAIL_HEADER, "ana@example.com"),
        )
        .await
        .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn test_email_is_optional() {
        let user = extract(Request::builder().header(USER_ID_HEADER, Uuid::new_v4().to_string()))
            .await
            .unwrap();
        assert!(user.email.is_none());
    }

    #[tokio::test]
    async fn test_missing_or_bad_id_is_unauthenticated() {
        assert!(matches!(
            extract(Request::builder()).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            extract(Request::builder().header(USER_ID_HEADER, "not-a-uuid")).await,
            Err(AppError::Unauthenticated)
        ));
    }
}
