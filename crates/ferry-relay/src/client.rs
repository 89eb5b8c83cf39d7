//! Relay client helpers shared by both roles.

use std::path::Path;

use anyhow::{Context, Result};

/// Upload a file to the relay. Any non-2xx response is an error — the
/// completion flow treats it as fatal and does not retry.
pub async fn upload(base_url: &str, path: &Path) -> Result<()> {
    use reqwest::multipart;

    let file_data =
        std::fs::read(path).with_context(|| format!("failed to read file: {}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();

    tracing::info!(file = file_name, bytes = file_data.len(), "uploading to relay");

    let part = multipart::Part::bytes(file_data).file_name(file_name.clone());
    let form = multipart::Form::new().part("upload_file", part);

    let client = reqwest::Client::new();
    client
        .post(format!("{}/upload", base_url))
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("failed to reach relay at {} — is it running?", base_url))?
        .error_for_status()
        .with_context(|| format!("relay rejected upload of {}", file_name))?;

    tracing::info!(file = file_name, "upload complete");
    Ok(())
}

/// Download a named artifact from the relay into `dest`.
pub async fn download_to(base_url: &str, file_name: &str, dest: &Path) -> Result<()> {
    tracing::info!(file = file_name, "downloading from relay");

    let response = reqwest::get(format!("{}/download/{}", base_url, file_name))
        .await
        .with_context(|| format!("failed to reach relay at {} — is it running?", base_url))?
        .error_for_status()
        .with_context(|| format!("relay has no file named {}", file_name))?;

    let bytes = response
        .bytes()
        .await
        .context("failed to read relay response body")?;

    std::fs::write(dest, &bytes)
        .with_context(|| format!("failed to write {}", dest.display()))?;

    tracing::info!(file = file_name, bytes = bytes.len(), dest = %dest.display(), "download complete");
    Ok(())
}
