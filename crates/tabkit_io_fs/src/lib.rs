//! `tabkit_io_fs`:
//! sandboxed file download core.
//!
//! Modules:
//! - `download` : path resolution, disposition encoding, chunked transfer
//! - `spec`     : enums/options/errors
//! - `report`   : transfer report model
//! - `util`     : shared path helpers

pub mod download;
pub mod report;
pub mod spec;
mod util;

pub use download::{
    BufferedDownloadResponse, DownloadResponse, EnumDownloadOutcome, copy_in_chunks,
    derive_content_disposition, derive_user_agent_family, encode_disposition_filename,
    resolve_download_path, resolve_download_request, serve_download,
};
pub use report::ReportTransfer;
pub use spec::{
    C_CONTENT_TYPE_DOWNLOAD, C_MSG_FILE_NOT_FOUND, DownloadError, EnumUserAgentFamily,
    N_SIZE_CHUNK_DEFAULT, SpecDownloadOptions, SpecDownloadTarget,
};
