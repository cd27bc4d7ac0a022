use crate::error::AppError;

/// Keys the server owns. Clients may send them but they never reach the
/// store as user fields.
pub const SYSTEM_KEYS: &[&str] = &["id", "_id", "createdAt", "updatedAt", "version"];

/// Validate an image URL: absolute `http`/`https` with a non-empty host and
/// no whitespace.
pub fn validate_image_url(url: &str) -> Result<(), AppError> {
    let invalid = || AppError::Validation(format!("imageUrl must be an absolute URL: {url:?}"));

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(invalid)?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(())
}
