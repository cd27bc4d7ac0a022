use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;

use super::error::StorageError;

const MAX_STEM_LEN: usize = 64;
const SUFFIX_LEN: usize = 8;

/// Generator for collision-resistant object keys.
pub struct BlobKey;

impl BlobKey {
    /// Build `{prefix}/{unix_millis}-{stem}-{random}.{extension}`.
    ///
    /// The stem comes from the uploaded filename with its extension removed.
    /// Uniqueness rests on the timestamp plus an 8 character random suffix.
    pub fn generate(prefix: &str, original_filename: &str, extension: &str) -> String {
        let stem = sanitize_stem(original_filename);
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        let millis = Utc::now().timestamp_millis();
        let prefix = prefix.trim_matches('/');

        if prefix.is_empty() {
            format!("{millis}-{stem}-{suffix}.{extension}")
        } else {
            format!("{prefix}/{millis}-{stem}-{suffix}.{extension}")
        }
    }
}

/// Reduce a filename to a safe lowercase ASCII stem.
fn sanitize_stem(filename: &str) -> String {
    // Browsers on Windows may send the full client path.
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };

    let mut out = String::with_capacity(stem.len().min(MAX_STEM_LEN));
    let mut pending_dash = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if out.len() >= MAX_STEM_LEN {
            break;
        }
    }
    out.truncate(MAX_STEM_LEN);
    let out = out.trim_matches('-').to_string();

    if out.is_empty() {
        "image".to_string()
    } else {
        out
    }
}

/// Validate an object key: relative, `/`-separated, no traversal segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |why: &str| Err(StorageError::InvalidKey(format!("{why}: {key:?}")));

    if key.is_empty() {
        return invalid("empty key");
    }
    if key.starts_with('/') {
        return invalid("absolute key");
    }
    if key.contains('\\') || key.contains('\0') {
        return invalid("forbidden character");
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return invalid("bad path segment");
    }
    Ok(())
}
