//! Download specification models and top-level error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Default MIME type sent with every download.
pub const C_CONTENT_TYPE_DOWNLOAD: &str = "application/x-msdownload";
/// Default copy buffer size in bytes.
pub const N_SIZE_CHUNK_DEFAULT: usize = 8192;
/// Body of the not-found response.
pub const C_MSG_FILE_NOT_FOUND: &str = "File not found!";

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Client family, as far as filename encoding is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumUserAgentFamily {
    /// Internet Explorer or a Trident-based browser: percent-encoded filename.
    InternetExplorer,
    /// Everything else, including a missing user agent: raw UTF-8 bytes.
    Other,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for serving downloads.
#[derive(Debug, Clone)]
pub struct SpecDownloadOptions {
    /// Directory every requested name is resolved against.
    pub path_dir_root: PathBuf,
    /// Copy buffer size in bytes.
    pub size_chunk: usize,
    /// `Content-Type` of successful responses.
    pub content_type: String,
}

impl Default for SpecDownloadOptions {
    fn default() -> Self {
        Self {
            path_dir_root: PathBuf::from("."),
            size_chunk: N_SIZE_CHUNK_DEFAULT,
            content_type: C_CONTENT_TYPE_DOWNLOAD.to_string(),
        }
    }
}

/// A resolved, existing regular file inside the download root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDownloadTarget {
    /// Canonical path of the file.
    pub path_file: PathBuf,
    /// Base name used in the disposition header.
    pub name_file: String,
    /// File size at resolution time.
    pub n_bytes: u64,
}

/// "Request cannot be served" errors, raised before any body byte is written.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Missing, empty or malformed `fileName`.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
    /// Name resolves outside the download root.
    #[error("Path escapes download root: {}", .0.display())]
    Forbidden(PathBuf),
    /// No regular file at the resolved path.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Filesystem failure while resolving or opening.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being inspected.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    /// Classify a failure to open an already resolved file.
    ///
    /// A file removed between resolution and open is still a 404.
    pub fn from_open(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidFileName(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Io { .. } => 500,
        }
    }

    /// Client-facing message; never contains filesystem paths.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidFileName(msg) => msg.clone(),
            Self::Forbidden(_) => "Access denied!".to_string(),
            Self::NotFound(_) => C_MSG_FILE_NOT_FOUND.to_string(),
            Self::Io { .. } => "Failed to read file!".to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
