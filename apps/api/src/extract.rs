use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// `Json` for request bodies, rejecting with `AppError` so a bad body gets
/// the same 400 envelope as every other validation failure.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::service::ApplyEditsRequest;
    use axum::body::Body;
    use axum::http::header;

    async fn extract(body: &'static str) -> Result<ApplyEditsRequest, AppError> {
        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        AppJson::<ApplyEditsRequest>::from_request(req, &())
            .await
            .map(|AppJson(value)| value)
    }

    #[tokio::test]
    async fn test_reads_json_body() {
        let req = extract(r#"{"ops":[{"op":"add_row"}],"save":true}"#)
            .await
            .unwrap();
        assert_eq!(req.ops.len(), 1);
        assert!(req.save);
    }

    #[tokio::test]
    async fn test_bad_bodies_are_validation_errors() {
        for body in [
            r#"{"ops":[{"op":"remove_row","row":-1}]}"#,
            r#"{"ops":[{"op":"explode"}]}"#,
            r#"{"ops":"#,
        ] {
            assert!(
                matches!(extract(body).await, Err(AppError::Validation(_))),
                "{body}"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_content_type_is_a_validation_error() {
        let req = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"ops":[]}"#))
            .unwrap();
        assert!(matches!(
            AppJson::<ApplyEditsRequest>::from_request(req, &()).await,
            Err(AppError::Validation(_))
        ));
    }
}
