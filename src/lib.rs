//! webroot - a small sequential HTTP/1.1 server
//!
//! Serves one connection at a time, one request per connection:
//!
//! - static files from a document root, with a fixed content-type table
//! - `calculate-next` and `calculate-area` endpoints
//! - substring redirect (`302`) and forbidden (`403`) rules
//! - raw uploads (`POST …/upload?name=<file>`) and downloads
//!   (`GET …/image?name=<file>`) against a storage directory
//!
//! # Dispatch order
//!
//! | Method | Target | Result |
//! |--------|--------|--------|
//! | `POST` | contains `/upload` | payload stored under the `name` parameter |
//! | `POST` | anything else | `404 Not Found` |
//! | `GET`  | contains `/image` | stored file, or the not-found page |
//! | `GET`  | without leading `/` | `400 Bad Request` |
//! | `GET`  | redirect key | `302 Found` |
//! | `GET`  | forbidden entry | `403 Forbidden` |
//! | `GET`  | `calculate-next` | `n + 1` |
//! | `GET`  | `calculate-area` | `(height * width) / 2` |
//! | `GET`  | anything else | static file |
//! | other  | | `400 Bad Request` |
//!
//! # Examples
//!
//! ```no_run
//! use webroot::{bind, config::Config, Router, Server};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = Config::default();
//!
//!     Server::builder()
//!         .listener(bind(config.socket_addr(), config.backlog).unwrap())
//!         .router(Router::from_config(&config).unwrap())
//!         .connection_limits(config.connection.clone())
//!         .request_limits(config.request.clone())
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

pub(crate) mod http {
    pub(crate) mod media;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod routing {
    pub(crate) mod number;
    pub(crate) mod router;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod listener;
    pub(crate) mod server_impl;
    pub(crate) mod transfer;
}
pub mod config;
pub(crate) mod errors;
pub mod limits;
pub mod storage;

pub use crate::{
    errors::{ErrorKind, IoError},
    http::{
        media::MediaType,
        request::Request,
        response::{write::WriteBuffer, Response},
        types::{Header, Method, StatusCode},
    },
    routing::{
        number::Number,
        router::{RouteDecision, Router},
    },
    server::{
        listener::bind,
        server_impl::{Server, ServerBuilder},
    },
};
