use crate::{
    errors::ErrorKind,
    http::request::Parser,
    limits::{ConnLimits, ReqLimits},
    server::transfer,
    RouteDecision, Router,
};
use std::{io, sync::Arc};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// Serves one request per connection: read, parse, route, respond.
///
/// The connection is closed by the caller dropping the stream once
/// [`run`](HttpConnection::run) returns.
pub(crate) struct HttpConnection {
    router: Arc<Router>,
    parser: Parser,

    conn_limits: ConnLimits,
    req_limits: ReqLimits,
}

impl HttpConnection {
    #[inline]
    pub(crate) fn new(router: Arc<Router>, conn_limits: ConnLimits, req_limits: ReqLimits) -> Self {
        Self {
            router,
            parser: Parser::new(&req_limits),

            conn_limits,
            req_limits,
        }
    }
}

impl HttpConnection {
    /// Handles the connection.
    ///
    /// Request errors, storage failures included, are answered with their
    /// canned response; only socket failures come back as `Err`.
    #[inline]
    pub(crate) async fn run<S>(&mut self, stream: &mut S) -> Result<(), io::Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.impl_run(stream).await {
            Ok(()) => Ok(()),
            Err(ErrorKind::Io(e)) => Err(e.0),
            Err(err) => {
                warn!(status = err.status().as_u16(), error = %err, "request rejected");
                writer::send_error(stream, self.conn_limits.socket_write_timeout, err).await
            }
        }
    }

    #[inline(always)]
    async fn impl_run<S>(&mut self, stream: &mut S) -> Result<(), ErrorKind>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.parser.reset();

        if self
            .parser
            .fill_buffer(stream, self.conn_limits.socket_read_timeout)
            .await?
            == 0
        {
            debug!("peer closed before sending a request");
            return Ok(());
        }

        let request = self.parser.parse()?;
        debug!(
            method = ?request.method(),
            uri = request.target(),
            version = request.version(),
            body = request.body().len(),
            "request parsed"
        );

        let response = match self.router.route(&request).await {
            RouteDecision::StoreFromClient { file_name } => {
                transfer::store_from_client(
                    stream,
                    &request,
                    &file_name,
                    self.router.store(),
                    &self.conn_limits,
                    &self.req_limits,
                )
                .await?
            }
            RouteDecision::ServeToClient { file_name } => {
                transfer::serve_to_client(&self.router, &file_name).await?
            }
            decision => match decision.into_response() {
                Some(response) => response,
                None => unreachable!("transfer decisions are answered above"),
            },
        };

        writer::write_bytes(stream, self.conn_limits.socket_write_timeout, response.buffer())
            .await?;

        Ok(())
    }
}

pub(crate) mod writer {
    use crate::errors::ErrorKind;
    use std::io;
    use tokio::{
        io::{AsyncWrite, AsyncWriteExt},
        time::{timeout, Duration},
    };

    #[inline(always)]
    pub(crate) async fn send_error<S: AsyncWrite + Unpin>(
        stream: &mut S,
        time: Duration,
        error: ErrorKind,
    ) -> Result<(), io::Error> {
        write_bytes(stream, time, error.as_http()).await
    }

    #[inline(always)]
    pub(crate) async fn write_bytes<S: AsyncWrite + Unpin>(
        stream: &mut S,
        time: Duration,
        response: &[u8],
    ) -> Result<(), io::Error> {
        timeout(time, async {
            stream.write_all(response).await?;
            stream.flush().await?;
            Ok::<_, io::Error>(())
        })
        .await?
    }
}
