pub mod image;
pub mod record;
pub mod shared;
