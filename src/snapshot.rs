use std::collections::HashMap;

use crate::{constants, http::client, model, store::sqlite};

const UPLOAD_URL: &str = "https://content.dropboxapi.com/2/files/upload";
const DOWNLOAD_URL: &str = "https://content.dropboxapi.com/2/files/download";

fn token() -> model::Result<String> {
    Ok(std::env::var(constants::DROPBOX_TOKEN_VAR)?)
}

/// Uploads a snapshot to Dropbox. With `overwrite` unset an existing file
/// at the same path makes the call fail instead of replacing it.
pub async fn upload(dropbox_path: &str, content: Vec<u8>, overwrite: bool) -> model::Result<()> {
    let token = token()?;

    let arg = serde_json::json!({
        "autorename": false,
        "mode": if overwrite { "overwrite" } else { "add" },
        "mute": false,
        "path": dropbox_path,
        "strict_conflict": false
    })
    .to_string();

    client::request_bytes(
        client::Method::Post(Some(content)),
        UPLOAD_URL,
        HashMap::new(),
        HashMap::from([
            ("Dropbox-API-Arg", arg.as_str()),
            ("Content-Type", "application/octet-stream"),
        ]),
        Some(&token),
    )
    .await?;

    Ok(())
}

/// Downloads a snapshot from Dropbox and returns its bytes.
pub async fn download(dropbox_path: &str) -> model::Result<Vec<u8>> {
    let token = token()?;

    let arg = serde_json::json!({ "path": dropbox_path }).to_string();

    let bytes = client::request_bytes(
        client::Method::Post(None),
        DOWNLOAD_URL,
        HashMap::new(),
        HashMap::from([("Dropbox-API-Arg", arg.as_str())]),
        Some(&token),
    )
    .await?;

    Ok(bytes)
}

/// Uploads the local SQLite file to Dropbox. Returns the byte count moved.
pub async fn push_database(dropbox_path: &str) -> model::Result<u64> {
    let db_path = sqlite::database_path();
    let content = std::fs::read(&db_path)?;
    let size = content.len() as u64;

    upload(dropbox_path, content, true).await?;
    log::info!("uploaded {} ({} bytes) to {}", db_path, size, dropbox_path);
    Ok(size)
}

/// Downloads the SQLite snapshot from Dropbox over the local file. The
/// existing file, if any, is replaced only after the download succeeds.
pub async fn pull_database(dropbox_path: &str) -> model::Result<u64> {
    let db_path = sqlite::database_path();
    let content = download(dropbox_path).await?;
    let size = content.len() as u64;

    std::fs::write(&db_path, content)?;
    log::info!(
        "downloaded {} ({} bytes) from {}",
        db_path,
        size,
        dropbox_path
    );
    Ok(size)
}
