//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! pdfium wants a file-system path, so URLs are downloaded into a `TempDir`
//! that lives as long as the [`ResolvedInput`]. The format is sniffed from
//! magic bytes before returning, so callers get `UnsupportedDocument` rather
//! than a pdfium or decoder crash.

use crate::error::AutofillError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// What an uploaded document turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentFormat {
    /// Classify by the first bytes of the file.
    pub fn sniff(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(b"%PDF") {
            Some(DocumentFormat::Pdf)
        } else if magic.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(DocumentFormat::Png)
        } else if magic.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(DocumentFormat::Jpeg)
        } else {
            None
        }
    }
}

/// The resolved input: either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    Local {
        path: PathBuf,
        format: DocumentFormat,
    },
    /// The `TempDir` is kept alive until processing completes.
    Downloaded {
        path: PathBuf,
        format: DocumentFormat,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn format(&self) -> DocumentFormat {
        match self {
            ResolvedInput::Local { format, .. } => *format,
            ResolvedInput::Downloaded { format, .. } => *format,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a scanned document (PDF, PNG or JPEG) to a local path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, AutofillError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input))
    }
}

/// Open `path` for reading, mapping the io error to the right variant.
pub(crate) fn open_checked(path: &Path) -> Result<std::fs::File, AutofillError> {
    if !path.exists() {
        return Err(AutofillError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => AutofillError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => AutofillError::FileNotFound {
            path: path.to_path_buf(),
        },
    })
}

fn resolve_local(path: &Path) -> Result<ResolvedInput, AutofillError> {
    let mut f = open_checked(path)?;
    let mut magic = [0u8; 4];
    let read = f.read(&mut magic).unwrap_or(0);
    let format = DocumentFormat::sniff(&magic[..read]).ok_or(AutofillError::UnsupportedDocument {
        path: path.to_path_buf(),
        magic,
    })?;

    debug!("Resolved local {:?}: {}", format, path.display());
    Ok(ResolvedInput::Local {
        path: path.to_path_buf(),
        format,
    })
}

/// Download `url` and return its bytes.
pub(crate) async fn fetch(url: &str, timeout_secs: u64) -> Result<Vec<u8>, AutofillError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AutofillError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AutofillError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AutofillError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AutofillError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AutofillError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    Ok(bytes.to_vec())
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, AutofillError> {
    info!("Downloading document from: {}", url);
    let bytes = fetch(url, timeout_secs).await?;

    let temp_dir = TempDir::new().map_err(|e| AutofillError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));

    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    let format = DocumentFormat::sniff(&bytes[..n]).ok_or(AutofillError::UnsupportedDocument {
        path: file_path.clone(),
        magic,
    })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| AutofillError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        format,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL if it looks like a filename.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded".to_string()
}
