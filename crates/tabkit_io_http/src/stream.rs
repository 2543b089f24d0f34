//! Chunked async file body.

use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use futures_util::Stream;
use futures_util::stream::try_unfold;
use tabkit_io_fs::ReportTransfer;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

struct SpecStreamState {
    file: File,
    v_buf: Vec<u8>,
    report: ReportTransfer,
    path_file: PathBuf,
}

/// Stream `file` as chunks of at most `size_chunk` bytes.
///
/// The file is closed when the stream ends, fails or is dropped. Read errors
/// end the stream with that error.
pub fn chunked_file_stream(
    file: File,
    path_file: PathBuf,
    size_chunk: usize,
) -> impl Stream<Item = Result<Bytes, io::Error>> {
    let state = SpecStreamState {
        file,
        v_buf: vec![0u8; usize::max(1, size_chunk)],
        report: ReportTransfer::default(),
        path_file,
    };

    try_unfold(state, |mut state| async move {
        let n_read = state.file.read(&mut state.v_buf).await.map_err(|err| {
            log::warn!(
                "download aborted after {} bytes: {} ({err})",
                state.report.cnt_bytes,
                state.path_file.display()
            );
            err
        })?;
        if n_read == 0 {
            log::info!(
                "{} file={}",
                state.report.format("[DOWNLOAD]"),
                state.path_file.display()
            );
            return Ok(None);
        }

        state.report.add_chunk(n_read);
        let chunk = Bytes::copy_from_slice(&state.v_buf[..n_read]);
        Ok::<_, io::Error>(Some((chunk, state)))
    })
}
