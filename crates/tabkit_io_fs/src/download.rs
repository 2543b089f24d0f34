//! Download resolution, disposition encoding and chunked transfer.
//!
//! The pieces here are framework-agnostic. Every host goes through
//! [`resolve_download_request`] and [`DownloadError::from_open`].
//! [`serve_download`] is the blocking, servlet-style entry point for hosts
//! that are not async (CGI, embedded servers, tests); it writes into any
//! [`DownloadResponse`]. The actix endpoint in `tabkit_io_http` streams the
//! same target through its own async body instead.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::report::ReportTransfer;
use crate::spec::{DownloadError, EnumUserAgentFamily, SpecDownloadOptions, SpecDownloadTarget};
use crate::util::{escape_quoted_filename, is_relative_to_base, normalize_path_lexically};

////////////////////////////////////////////////////////////////////////////////
// #region Resolve

/// Resolve the `fileName` request parameter; a missing parameter is a 400.
pub fn resolve_download_request(
    options: &SpecDownloadOptions,
    file_name: Option<&str>,
) -> Result<SpecDownloadTarget, DownloadError> {
    let file_name = file_name
        .ok_or_else(|| DownloadError::InvalidFileName("fileName is required.".to_string()))?;
    resolve_download_path(&options.path_dir_root, file_name)
}

/// Resolve `file_name` to an existing regular file under `path_dir_root`.
///
/// Relative names are joined to the root; absolute names must already point
/// inside it. The check is done twice: lexically, then again after symlinks
/// are resolved.
pub fn resolve_download_path(
    path_dir_root: &Path,
    file_name: &str,
) -> Result<SpecDownloadTarget, DownloadError> {
    if file_name.trim().is_empty() {
        return Err(DownloadError::InvalidFileName(
            "fileName must not be empty.".to_string(),
        ));
    }
    if file_name.contains('\0') {
        return Err(DownloadError::InvalidFileName(
            "fileName must not contain NUL bytes.".to_string(),
        ));
    }

    let path_dir_root_canon =
        fs::canonicalize(path_dir_root).map_err(|source| DownloadError::Io {
            path: path_dir_root.to_path_buf(),
            source,
        })?;

    let path_candidate = normalize_path_lexically(&path_dir_root_canon.join(file_name));
    if !is_relative_to_base(&path_candidate, &path_dir_root_canon) {
        log::warn!("rejected download outside root: {file_name:?}");
        return Err(DownloadError::Forbidden(path_candidate));
    }

    let path_file = match fs::canonicalize(&path_candidate) {
        Ok(path) => path,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            return Err(DownloadError::Io {
                path: path_candidate,
                source: err,
            });
        }
        Err(_) => return Err(DownloadError::NotFound(path_candidate)),
    };
    if !is_relative_to_base(&path_file, &path_dir_root_canon) {
        log::warn!("rejected download through symlink leaving root: {file_name:?}");
        return Err(DownloadError::Forbidden(path_file));
    }

    let meta_file = fs::metadata(&path_file).map_err(|source| DownloadError::Io {
        path: path_file.clone(),
        source,
    })?;
    if !meta_file.is_file() {
        return Err(DownloadError::NotFound(path_file));
    }

    let name_file = path_candidate
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(SpecDownloadTarget {
        path_file,
        name_file,
        n_bytes: meta_file.len(),
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Disposition

/// Classify a `User-Agent` header value.
pub fn derive_user_agent_family(user_agent: Option<&str>) -> EnumUserAgentFamily {
    match user_agent {
        Some(agent) if agent.contains("MSIE") || agent.contains("Trident") => {
            EnumUserAgentFamily::InternetExplorer
        }
        _ => EnumUserAgentFamily::Other,
    }
}

/// Filename bytes for the disposition header.
///
/// IE-family agents get percent-encoded UTF-8; others get the UTF-8 bytes as-is,
/// which Latin-1 header readers see byte for byte.
pub fn encode_disposition_filename(name_file: &str, family: EnumUserAgentFamily) -> Vec<u8> {
    match family {
        EnumUserAgentFamily::InternetExplorer => {
            urlencoding::encode(name_file).into_owned().into_bytes()
        }
        EnumUserAgentFamily::Other => escape_quoted_filename(name_file).into_bytes(),
    }
}

/// Full `Content-Disposition` value: `attachment; filename="<encoded>"`.
pub fn derive_content_disposition(name_file: &str, family: EnumUserAgentFamily) -> Vec<u8> {
    let mut v_value = b"attachment; filename=\"".to_vec();
    v_value.extend_from_slice(&encode_disposition_filename(name_file, family));
    v_value.push(b'"');
    v_value
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Transfer

/// Copy `reader` into `writer` through a buffer of `size_chunk` bytes.
pub fn copy_in_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    size_chunk: usize,
) -> io::Result<ReportTransfer>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if size_chunk == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "size_chunk must be >= 1",
        ));
    }

    let mut v_buf = vec![0u8; size_chunk];
    let mut report = ReportTransfer::default();
    loop {
        let n_read = match reader.read(&mut v_buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        writer.write_all(&v_buf[..n_read])?;
        report.add_chunk(n_read);
    }
    writer.flush()?;
    Ok(report)
}

/// Minimal response surface needed to serve a download.
pub trait DownloadResponse {
    /// Drop any status, headers or body buffered so far.
    fn reset(&mut self);
    /// Finish the response with an error status and plain-text message.
    fn send_error(&mut self, status: u16, message: &str) -> io::Result<()>;
    /// Set the `Content-Type` header.
    fn set_content_type(&mut self, content_type: &str);
    /// Set a raw header value.
    fn set_header(&mut self, name: &str, value: &[u8]);
    /// Body sink.
    fn body(&mut self) -> &mut dyn Write;
}

/// Result of [`serve_download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumDownloadOutcome {
    /// File streamed in full.
    Sent(ReportTransfer),
    /// Request refused before any body byte was written.
    Rejected {
        /// HTTP status sent.
        status: u16,
        /// Message sent.
        message: String,
    },
}

/// Serve `file_name` into `response` (blocking).
///
/// Resolution and open failures are answered through
/// [`DownloadResponse::send_error`]; failures while streaming are returned.
pub fn serve_download<S: DownloadResponse + ?Sized>(
    options: &SpecDownloadOptions,
    file_name: Option<&str>,
    user_agent: Option<&str>,
    response: &mut S,
) -> io::Result<EnumDownloadOutcome> {
    let result_file = resolve_download_request(options, file_name).and_then(|target| {
        File::open(&target.path_file)
            .map(|file| (target.clone(), file))
            .map_err(|source| DownloadError::from_open(target.path_file.clone(), source))
    });

    let (target, mut file) = match result_file {
        Ok(v) => v,
        Err(err) => {
            log::info!("download rejected ({}): {err}", err.status_code());
            let message = err.message();
            response.send_error(err.status_code(), &message)?;
            return Ok(EnumDownloadOutcome::Rejected {
                status: err.status_code(),
                message,
            });
        }
    };

    response.reset();
    response.set_content_type(&options.content_type);
    let family = derive_user_agent_family(user_agent);
    response.set_header(
        "Content-Disposition",
        &derive_content_disposition(&target.name_file, family),
    );

    let report = copy_in_chunks(&mut file, response.body(), options.size_chunk)?;
    log::info!(
        "{} file={}",
        report.format("[DOWNLOAD]"),
        target.path_file.display()
    );
    Ok(EnumDownloadOutcome::Sent(report))
}

/// In-memory [`DownloadResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedDownloadResponse {
    /// Status code, 200 until an error is sent.
    pub status: u16,
    /// Content type, if set.
    pub content_type: Option<String>,
    /// Raw headers in insertion order.
    pub headers: Vec<(String, Vec<u8>)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl Default for BufferedDownloadResponse {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl BufferedDownloadResponse {
    /// First header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(c_name, _)| c_name.eq_ignore_ascii_case(name))
            .map(|(_, v_value)| v_value.as_slice())
    }
}

impl DownloadResponse for BufferedDownloadResponse {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn send_error(&mut self, status: u16, message: &str) -> io::Result<()> {
        self.reset();
        self.status = status;
        self.content_type = Some("text/plain; charset=utf-8".to_string());
        self.body.extend_from_slice(message.as_bytes());
        Ok(())
    }

    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn set_header(&mut self, name: &str, value: &[u8]) {
        self.headers.retain(|(c_name, _)| !c_name.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_vec()));
    }

    fn body(&mut self) -> &mut dyn Write {
        &mut self.body
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
