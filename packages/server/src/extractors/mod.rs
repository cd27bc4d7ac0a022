pub mod json;
pub mod multipart;
pub mod query;
