pub mod cleanup;
pub mod error;
pub mod extract;
pub mod filter;
pub mod prompt;
pub mod reader;

use std::path::PathBuf;

/// One file received in a multipart upload, persisted to scratch storage.
///
/// Owned by exactly one request. The backing `stored_path` must be removed
/// before the response is finalized, on every exit path.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-declared name; carries a relative path for folder uploads.
    pub original_path: String,
    pub stored_path: PathBuf,
    pub size_bytes: u64,
}

pub use error::{ExtractError, ReadError};
pub use extract::extract_archive;
pub use filter::ExtensionFilter;
pub use prompt::build_prompt;
pub use reader::{read_batch, read_tree, BatchOutcome};
