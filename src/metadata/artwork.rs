//! Artwork URL fetch → tmpfile (§4.E).
//!
//! The HTTP call itself uses `reqwest`'s async client driven through a
//! small single-threaded `tokio::runtime::Runtime` owned by the caller —
//! the same `Runtime::block_on` shape the teacher's CLI commands use to
//! call async code from an otherwise synchronous command handler, since
//! the command-pipe thread here is a native OS thread, not an async task.

use std::io::Write;
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkFormat {
    Jpeg,
    Png,
}

impl ArtworkFormat {
    fn extension(self) -> &'static str {
        match self {
            ArtworkFormat::Jpeg => ".jpg",
            ArtworkFormat::Png => ".png",
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or("").trim();
        match mime {
            "image/jpeg" | "image/jpg" => Some(ArtworkFormat::Jpeg),
            "image/png" => Some(ArtworkFormat::Png),
            _ => None,
        }
    }
}

pub struct ArtworkBytes {
    pub data: Vec<u8>,
    pub format: ArtworkFormat,
}

/// Bounds on a plausible artwork URL length (§4.E bound `[14, PATH_MAX]`).
const MIN_URL_LEN: usize = 14;
const MAX_URL_LEN: usize = libc::PATH_MAX as usize;

/// Fetch `url` and return its bytes and sniffed format, or `Ok(None)` if
/// the server reports 404 ("absent", not an error). Any other non-200
/// status is an error.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Option<ArtworkBytes>> {
    if url.len() < MIN_URL_LEN {
        return Err(Error::parse(format!("artwork url too short: {url}")));
    }
    if url.len() > MAX_URL_LEN {
        return Err(Error::parse(format!("artwork url too long: {} bytes", url.len())));
    }
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::http(e.to_string()))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(Error::http(format!(
            "HTTP {}: {}",
            response.status().as_u16(),
            response.status().canonical_reason().unwrap_or("unknown")
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    let format = ArtworkFormat::from_content_type(&content_type)
        .ok_or_else(|| Error::http(format!("unsupported content-type: {content_type}")))?;

    let data = response
        .bytes()
        .await
        .map_err(|e| Error::http(e.to_string()))?
        .to_vec();

    Ok(Some(ArtworkBytes { data, format }))
}

/// Write `bytes` to a fresh tmpfile `"/tmp/<pkg>.XXXXXX.<ext>"`, preserving
/// the 4-character extension suffix (mkstemps-style). Returns the raw fd
/// (kept open so the caller can close it on replacement) and the path.
pub fn write_tmpfile(pkg: &str, bytes: &ArtworkBytes) -> Result<(RawFd, PathBuf)> {
    let file = tempfile::Builder::new()
        .prefix(&format!("{pkg}."))
        .suffix(bytes.format.extension())
        .tempfile_in(std::env::temp_dir())?;
    let (mut file, path) = file.keep().map_err(|e| Error::Io(e.error))?;
    file.write_all(&bytes.data)?;
    file.flush()?;
    let fd = file.as_raw_fd();
    // Leak the `File` handle deliberately: the caller tracks the fd/path
    // pair in `StagedMetadata` and is responsible for unlinking the path
    // when it is superseded (§3 "Artwork tmpfile" lifecycle).
    std::mem::forget(file);
    Ok((fd, path))
}

/// Close and unlink a previously installed tmpfile.
pub fn remove_tmpfile(path: &std::path::Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(target: "metadata::artwork", path = %path.display(), error = %e, "failed to unlink old artwork tmpfile");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_sniffing() {
        assert_eq!(ArtworkFormat::from_content_type("image/jpeg"), Some(ArtworkFormat::Jpeg));
        assert_eq!(ArtworkFormat::from_content_type("image/jpg"), Some(ArtworkFormat::Jpeg));
        assert_eq!(ArtworkFormat::from_content_type("image/png"), Some(ArtworkFormat::Png));
        assert_eq!(ArtworkFormat::from_content_type("text/html"), None);
    }

    #[test]
    fn write_tmpfile_preserves_extension_and_bytes() {
        let bytes = ArtworkBytes {
            data: b"fake-jpeg-bytes".to_vec(),
            format: ArtworkFormat::Jpeg,
        };
        let (_fd, path) = write_tmpfile("cliap2", &bytes).unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, b"fake-jpeg-bytes");
        remove_tmpfile(&path);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn fetch_rejects_url_below_minimum_length() {
        let client = reqwest::Client::new();
        let result = fetch(&client, "short").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fetch_rejects_url_above_maximum_length() {
        let client = reqwest::Client::new();
        let url = format!("http://example/{}", "a".repeat(MAX_URL_LEN));
        let result = fetch(&client, &url).await;
        assert!(result.is_err());
    }
}
