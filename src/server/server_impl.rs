use crate::{
    limits::{ConnLimits, ReqLimits},
    server::connection::HttpConnection,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// A sequential HTTP server.
///
/// Connections are served strictly one after another: the next `accept`
/// happens only after the previous connection was answered and closed.
///
/// # Examples
///
/// ```no_run
/// use webroot::{bind, Router, Server};
/// use webroot::storage::{DocumentRoot, UploadStore};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let router = Router::new(
///         DocumentRoot::open("webroot").unwrap(),
///         UploadStore::new("uploads"),
///     );
///
///     Server::builder()
///         .listener(bind("127.0.0.1:8080".parse().unwrap(), 10).unwrap())
///         .router(router)
///         .build()
///         .launch()
///         .await
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    conn: HttpConnection,
}

impl Server {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            listener: None,
            router: None,

            request_limits: None,
            connection_limits: None,
        }
    }

    /// Accepts and serves connections forever.
    ///
    /// A failing connection is logged and dropped; it never stops the loop.
    #[inline]
    pub async fn launch(mut self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(address = %addr, "listening for connections");
        }

        loop {
            let (mut stream, addr) = match self.listener.accept().await {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            };

            info!(client = %addr, "client connected");

            if let Err(err) = self.conn.run(&mut stream).await {
                warn!(client = %addr, error = %err, "connection failed");
            }

            drop(stream);
            info!(client = %addr, "connection closed");
        }
    }
}

//

/// Builder for configuring and creating [`Server`] instances.
pub struct ServerBuilder {
    listener: Option<TcpListener>,
    router: Option<Arc<Router>>,

    request_limits: Option<ReqLimits>,
    connection_limits: Option<ConnLimits>,
}

impl ServerBuilder {
    /// Sets the TCP listener that the server will use to accept connections.
    ///
    /// **This is a required component.** See [`bind`](crate::bind).
    #[inline(always)]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the router that decides every response.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    /// Configures socket and upload timeouts.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use webroot::{bind, Router, Server};
    /// # use webroot::storage::{DocumentRoot, UploadStore};
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// # let router = Router::new(DocumentRoot::open("webroot").unwrap(), UploadStore::new("uploads"));
    /// use webroot::limits::ConnLimits;
    /// use std::time::Duration;
    ///
    /// let server = Server::builder()
    ///     .listener(bind("127.0.0.1:8080".parse().unwrap(), 10).unwrap())
    ///     .router(router)
    ///     .connection_limits(ConnLimits {
    ///         // Your changes
    ///         socket_read_timeout: Duration::from_secs(5),
    ///         upload_idle_timeout: Duration::from_millis(500),
    ///         ..ConnLimits::default() // Required line
    ///     })
    ///     .build();
    /// # }
    /// ```
    #[inline(always)]
    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = Some(limits);
        self
    }

    /// Configures the request buffer and upload sizes.
    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Finalizes the builder and constructs a [`Server`] instance.
    ///
    /// # Panics
    ///
    /// Error messages:
    /// - ``The `listener` method must be called to create``
    /// - ``The `router` method must be called to create``
    /// - `ReqLimits::buffer_size must be positive`
    /// - `ReqLimits::upload_chunk_size must be positive`
    ///
    /// Panics when:
    /// - The `listener` method was not called.
    /// - The `router` method was not called.
    /// - A request buffer or upload chunk of zero bytes was configured.
    #[inline]
    #[track_caller]
    pub fn build(self) -> Server {
        let listener = self
            .listener
            .expect("The `listener` method must be called to create");
        let router = self
            .router
            .expect("The `router` method must be called to create");

        let req_limits = self.request_limits.unwrap_or_default();
        assert!(
            req_limits.buffer_size > 0,
            "ReqLimits::buffer_size must be positive"
        );
        assert!(
            req_limits.upload_chunk_size > 0,
            "ReqLimits::upload_chunk_size must be positive"
        );

        let conn = HttpConnection::new(
            router,
            self.connection_limits.unwrap_or_default(),
            req_limits,
        );

        Server { listener, conn }
    }
}
