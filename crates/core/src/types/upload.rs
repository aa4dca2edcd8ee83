//! Uploaded file descriptor.

use serde::{Deserialize, Serialize};

/// A file stored by the upload endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    pub url: String,
    pub filename: String,
    pub size: u64,
}
