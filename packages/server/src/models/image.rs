use serde::{Deserialize, Serialize};

/// Response DTO for a completed upload.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Public URL of the stored image.
    #[schema(example = "http://127.0.0.1:3000/blobs/images/1718000000000-dunes-k3j9x0qa.jpg")]
    pub url: String,
    /// Object store key; persist as `imagePath` to simplify deletion.
    #[schema(example = "images/1718000000000-dunes-k3j9x0qa.jpg")]
    pub pathname: String,
    /// Content type of the stored (transcoded) image.
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    /// Stored size in bytes.
    #[schema(example = 84213)]
    pub size: u64,
}

/// Body for `DELETE /api/image`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DeleteImageRequest {
    /// Public URL or pathname of the image.
    pub url: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeleteImageResponse {
    pub deleted: String,
}
