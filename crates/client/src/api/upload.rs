//! File upload endpoints.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use shopfront_core::FileUpload;
use tracing::instrument;

use super::{ApiClient, ApiError, Auth};

/// A file to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Build a file, guessing the content type from the extension.
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    fn into_part(self) -> Result<Part, ApiError> {
        Part::bytes(self.bytes)
            .file_name(self.filename)
            .mime_str(&self.content_type)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }
}

/// Image types the upload endpoints accept, everything else is sent as
/// `application/octet-stream` and rejected server-side.
fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// Upload one image.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 400 for unsupported types or files
    /// over the server's size limit.
    #[instrument(skip(self, file), fields(filename = %file.filename, size = file.bytes.len()))]
    pub async fn upload_file(&self, file: UploadFile) -> Result<FileUpload, ApiError> {
        let form = Form::new().part("file", file.into_part()?);
        let req = self.request(Method::POST, "upload/single")?.multipart(form);
        self.send_json(req, Auth::Stored).await
    }

    /// Upload several images. Files the server rejects are silently left out
    /// of the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload_files(&self, files: Vec<UploadFile>) -> Result<Vec<FileUpload>, ApiError> {
        let mut form = Form::new();
        for file in files {
            form = form.part("files", file.into_part()?);
        }
        let req = self
            .request(Method::POST, "upload/multiple")?
            .multipart(form);
        self.send_json(req, Auth::Stored).await
    }

    /// Delete a previously uploaded file by its URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn delete_upload(&self, file_url: &str) -> Result<(), ApiError> {
        let req = self
            .request(Method::DELETE, "upload/")?
            .query(&[("file_url", file_url)]);
        self.send_unit(req, Auth::Stored).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.b.webp"), "image/webp");
        assert_eq!(content_type_for("notes.txt"), "application/octet-stream");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_upload_file_new() {
        let file = UploadFile::new("mug.png", vec![1, 2, 3]);
        assert_eq!(file.content_type, "image/png");
        assert!(file.into_part().is_ok());
    }
}
