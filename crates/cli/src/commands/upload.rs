//! File uploads.

use std::path::PathBuf;

use shopfront_client::Storefront;
use shopfront_client::api::upload::UploadFile;

use super::CliError;
use crate::output;

pub async fn add(storefront: &Storefront, paths: &[PathBuf]) -> Result<(), CliError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await.map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        files.push(UploadFile::new(filename, bytes));
    }

    let uploads = match <[UploadFile; 1]>::try_from(files) {
        Ok([file]) => vec![storefront.api().upload_file(file).await?],
        Err(files) => storefront.api().upload_files(files).await?,
    };
    output::uploads(&uploads);
    Ok(())
}

pub async fn delete(storefront: &Storefront, url: &str) -> Result<(), CliError> {
    storefront.api().delete_upload(url).await?;
    output::line("File deleted");
    Ok(())
}
