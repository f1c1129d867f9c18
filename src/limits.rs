//! Timeouts and size limits
//!
//! # Defaults
//!
//! | Limit | Default |
//! |-------|---------|
//! | [`ConnLimits::socket_read_timeout`] | `30 seconds` |
//! | [`ConnLimits::socket_write_timeout`] | `30 seconds` |
//! | [`ConnLimits::upload_idle_timeout`] | `2 seconds` |
//! | [`ReqLimits::buffer_size`] | `16 KiB` |
//! | [`ReqLimits::upload_chunk_size`] | `1 KiB` |
//! | [`ReqLimits::max_upload_size`] | `64 MiB` |
//!
//! Durations are written in seconds in the configuration file.
//!
//! # Examples
//!
//! ```no_run
//! use webroot::{bind, limits::{ConnLimits, ReqLimits}, Router, Server};
//! use webroot::storage::{DocumentRoot, UploadStore};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let router = Router::new(
//!         DocumentRoot::open("webroot").unwrap(),
//!         UploadStore::new("uploads"),
//!     );
//!
//!     Server::builder()
//!         .listener(bind("127.0.0.1:8080".parse().unwrap(), 10).unwrap())
//!         .router(router)
//!         .connection_limits(ConnLimits {
//!             socket_read_timeout: Duration::from_secs(5),
//!             ..ConnLimits::default()
//!         })
//!         .request_limits(ReqLimits {
//!             max_upload_size: 1024 * 1024, // 1 MiB uploads
//!             ..ReqLimits::default()
//!         })
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controls per-connection timeouts.
///
/// The server handles one connection at a time, so a stalled client holds
/// up every client behind it until one of these timeouts fires.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnLimits {
    /// Maximum duration to wait for the request (default: `30 seconds`)
    ///
    /// If no data is received within this time, the connection is closed
    /// without a response.
    #[serde(with = "secs")]
    pub socket_read_timeout: Duration,

    /// Maximum duration to wait for writing the response (default: `30 seconds`)
    ///
    /// Applies to each write operation separately.
    #[serde(with = "secs")]
    pub socket_write_timeout: Duration,

    /// Silence that ends an upload without `Content-Length` (default: `2 seconds`)
    ///
    /// Whatever arrived before the silence is stored.
    #[serde(with = "secs")]
    pub upload_idle_timeout: Duration,

    #[doc(hidden)]
    #[allow(dead_code)]
    #[serde(skip)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            socket_read_timeout: Duration::from_secs(30),
            socket_write_timeout: Duration::from_secs(30),
            upload_idle_timeout: Duration::from_secs(2),

            _priv: (),
        }
    }
}

/// Controls request buffering and upload sizes.
///
/// # Memory allocation
///
/// The request buffer of `buffer_size` bytes is allocated once per server and
/// reused for every connection. Uploads grow a separate buffer up to
/// `max_upload_size`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReqLimits {
    /// Size of the single read that receives a request (default: `16 KiB`)
    ///
    /// Anything past it stays in the socket; for uploads it is read as
    /// part of the payload.
    pub buffer_size: usize,

    /// Size of each read while receiving an upload (default: `1 KiB`)
    pub upload_chunk_size: usize,

    /// Maximum upload payload in bytes (default: `64 MiB`)
    ///
    /// Larger uploads are answered with `413 Payload Too Large` and nothing
    /// is written.
    pub max_upload_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    #[serde(skip)]
    pub _priv: (),
}

impl Default for ReqLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            buffer_size: 16 * 1024,
            upload_chunk_size: 1024,
            max_upload_size: 64 * 1024 * 1024,

            _priv: (),
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;

        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
