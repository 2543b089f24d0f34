//! `tabkit_io_http`:
//! actix-web surface for `tabkit_io_fs` downloads.
//!
//! - `config`   : TOML server configuration
//! - `handlers` : GET/POST `/download` handlers
//! - `logging`  : tracing subscriber setup
//! - `stream`   : chunked async file body

use actix_web::web;

pub mod config;
pub mod handlers;
pub mod logging;
pub mod stream;

pub use config::ServerConfig;
pub use handlers::{DownloadQuery, HttpDownloadError, download_get, download_post};

/// Register `/download` (GET and POST).
///
/// Handlers read `web::Data<SpecDownloadOptions>` from app data.
///
/// [`SpecDownloadOptions`]: tabkit_io_fs::SpecDownloadOptions
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/download")
            .route(web::get().to(handlers::download_get))
            .route(web::post().to(handlers::download_post)),
    );
}
