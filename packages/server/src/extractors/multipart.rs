use axum::extract::multipart::MultipartRejection;
use axum::extract::{FromRequest, Multipart, Request};

use crate::error::AppError;

/// `Multipart` whose rejections come back as the `{error}` envelope with 400.
pub struct AppMultipart(pub Multipart);

impl<S> FromRequest<S> for AppMultipart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(AppMultipart)
            .map_err(|rejection: MultipartRejection| {
                AppError::Validation(format!(
                    "Expected a multipart/form-data body: {}",
                    rejection.body_text()
                ))
            })
    }
}
