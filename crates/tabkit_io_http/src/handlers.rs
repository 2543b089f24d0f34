// Download handlers - GET|POST /download?fileName=<name>
use std::io;

use actix_web::http::StatusCode;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use log::debug;
use serde::Deserialize;
use tabkit_io_fs::{
    DownloadError, SpecDownloadOptions, derive_content_disposition, derive_user_agent_family,
    resolve_download_request,
};

use crate::stream::chunked_file_stream;

/// `fileName` parameter, from the query string or a form body
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

/// [`DownloadError`] rendered as a plain-text HTTP error
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct HttpDownloadError(#[from] pub DownloadError);

impl ResponseError for HttpDownloadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.0.message())
    }
}

/// Handler for GET /download
pub async fn download_get(
    req: HttpRequest,
    query: web::Query<DownloadQuery>,
    options: web::Data<SpecDownloadOptions>,
) -> Result<HttpResponse, HttpDownloadError> {
    serve_file(&req, query.into_inner().file_name, &options).await
}

/// Handler for POST /download; same as GET, `fileName` may also come from a form
pub async fn download_post(
    req: HttpRequest,
    query: web::Query<DownloadQuery>,
    form: Option<web::Form<DownloadQuery>>,
    options: web::Data<SpecDownloadOptions>,
) -> Result<HttpResponse, HttpDownloadError> {
    let file_name = query
        .into_inner()
        .file_name
        .or_else(|| form.and_then(|form| form.into_inner().file_name));
    serve_file(&req, file_name, &options).await
}

async fn serve_file(
    req: &HttpRequest,
    file_name: Option<String>,
    options: &SpecDownloadOptions,
) -> Result<HttpResponse, HttpDownloadError> {
    debug!("download requested: {:?}", file_name);

    let options_resolve = options.clone();
    let target =
        match web::block(move || resolve_download_request(&options_resolve, file_name.as_deref()))
            .await
        {
            Ok(result) => result?,
            Err(err) => {
                return Err(DownloadError::Io {
                    path: options.path_dir_root.clone(),
                    source: io::Error::other(err),
                }
                .into());
            }
        };

    let file = tokio::fs::File::open(&target.path_file)
        .await
        .map_err(|source| DownloadError::from_open(target.path_file.clone(), source))?;

    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok());
    let v_disposition =
        derive_content_disposition(&target.name_file, derive_user_agent_family(user_agent));
    let value_disposition = HeaderValue::from_bytes(&v_disposition).map_err(|_| {
        DownloadError::InvalidFileName("fileName cannot be sent as a header.".to_string())
    })?;

    Ok(HttpResponse::Ok()
        .content_type(options.content_type.as_str())
        .insert_header((header::CONTENT_DISPOSITION, value_disposition))
        .streaming(chunked_file_stream(
            file,
            target.path_file,
            options.size_chunk,
        )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::test;
    use std::path::PathBuf;

    #[actix_web::test]
    async fn test_error_response_body_is_message_only() {
        let err = HttpDownloadError(DownloadError::NotFound(PathBuf::from("/srv/x.txt")));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(body.as_ref(), b"File not found!");
    }

    #[actix_web::test]
    async fn test_get_without_file_name_is_bad_request() {
        let req = test::TestRequest::get().uri("/download").to_http_request();
        let query = web::Query::<DownloadQuery>::from_query("").unwrap();
        let options = web::Data::new(SpecDownloadOptions::default());

        let err = download_get(req, query, options).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
