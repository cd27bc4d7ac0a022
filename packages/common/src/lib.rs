pub mod config;
pub mod retry;
pub mod storage;
pub mod transcode;

pub use retry::{Backoff, RetryError, RetryPolicy, retry};
pub use transcode::{TranscodeError, TranscodeOptions, Transcoded, transcode};
