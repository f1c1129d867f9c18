//! Raw uploads and downloads of stored files.

use crate::{
    errors::ErrorKind,
    limits::{ConnLimits, ReqLimits},
    storage::UploadStore,
    Request, Response, Router, StatusCode,
};
use tokio::{
    fs,
    io::{AsyncRead, AsyncReadExt},
    time::timeout,
};
use tracing::{debug, info};

/// Answers `GET …/image?name=<file>` with the stored bytes.
///
/// A missing file, or a name that cannot be stored, gets a `404` whose body
/// is the router's not-found page (empty if that page is missing too).
pub(crate) async fn serve_to_client(router: &Router, file_name: &str) -> Result<Response, ErrorKind> {
    let mut resp = Response::new();

    match router.store().read(file_name).await {
        Ok(Some(data)) => {
            debug!(file_name, size = data.len(), "serving stored file");
            resp.status(StatusCode::Ok)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(data);
        }
        Ok(None) | Err(ErrorKind::InvalidFileName(_)) => {
            debug!(file_name, "stored file not found");
            let page = fs::read(router.not_found_page_path())
                .await
                .unwrap_or_default();
            resp.status(StatusCode::NotFound).body(page);
        }
        Err(err) => return Err(err),
    }

    Ok(resp)
}

/// Receives the payload of `POST …/upload?name=<file>` and stores it.
///
/// The payload starts with the body bytes read together with the request
/// head. With `Content-Length` reading stops once that many bytes arrived;
/// otherwise it stops at end of stream, or after
/// [`upload_idle_timeout`](ConnLimits::upload_idle_timeout) of silence.
/// Until the first payload byte the wait is
/// [`socket_read_timeout`](ConnLimits::socket_read_timeout).
///
/// # Errors
/// - [`ErrorKind::InvalidFileName`] before anything is read
/// - [`ErrorKind::PayloadTooLarge`] past [`ReqLimits::max_upload_size`]
pub(crate) async fn store_from_client<S: AsyncRead + Unpin>(
    stream: &mut S,
    request: &Request,
    file_name: &str,
    store: &UploadStore,
    conn_limits: &ConnLimits,
    req_limits: &ReqLimits,
) -> Result<Response, ErrorKind> {
    store.resolve(file_name)?;

    let limit = req_limits.max_upload_size;
    let expected = request.content_length();
    if expected.is_some_and(|len| len > limit) {
        return Err(ErrorKind::PayloadTooLarge { limit });
    }

    let mut payload = request.body().to_vec();
    let mut chunk = vec![0; req_limits.upload_chunk_size];

    loop {
        if let Some(len) = expected {
            if payload.len() >= len {
                payload.truncate(len);
                break;
            }
        }
        if payload.len() > limit {
            return Err(ErrorKind::PayloadTooLarge { limit });
        }

        let wait = match payload.is_empty() {
            true => conn_limits.socket_read_timeout,
            false => conn_limits.upload_idle_timeout,
        };

        match timeout(wait, stream.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => payload.extend_from_slice(&chunk[..n]),
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                debug!(file_name, received = payload.len(), "upload went idle");
                break;
            }
        }
    }

    if payload.len() > limit {
        return Err(ErrorKind::PayloadTooLarge { limit });
    }

    let path = store.write(file_name, &payload).await?;
    info!(path = %path.display(), size = payload.len(), "file stored");

    Ok(Response::success(
        StatusCode::Ok,
        format!("File '{file_name}' uploaded successfully"),
    ))
}
