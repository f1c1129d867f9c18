//! Server configuration.
//!
//! Loaded from a TOML file; every key is optional and falls back to the
//! default shown in [`Config`]. Validation collects all problems instead of
//! stopping at the first one.
//!
//! ```toml
//! bind_address = "127.0.0.1"
//! port = 8080
//! document_root = "webroot"
//! forbidden = ["webroot/forbidden"]
//!
//! [[redirects]]
//! from = "webroot/redirect"
//! to = "webroot/index.html"
//!
//! [connection]
//! socket_read_timeout = 30
//!
//! [request]
//! max_upload_size = 67108864
//! ```

use crate::limits::{ConnLimits, ReqLimits};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One entry of the redirect table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RedirectRule {
    /// Substring of the target that triggers the redirect.
    pub from: String,
    /// Resource sent in `Location`, prefixed with `/`.
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// default: `127.0.0.1`
    pub bind_address: IpAddr,
    /// default: `8080`
    pub port: u16,
    /// Pending connection queue length (default: `10`)
    pub backlog: i32,

    /// Directory static files are served from (default: `webroot`)
    pub document_root: PathBuf,
    /// Served for `/`, relative to the document root (default: `index.html`)
    pub default_document: String,
    /// default: `uploads`
    pub storage_dir: PathBuf,
    /// Body of a `404` from the download route (default: `404_show.html`)
    pub not_found_page: PathBuf,

    /// Checked in order; the first matching rule wins.
    pub redirects: Vec<RedirectRule>,
    pub forbidden: Vec<String>,

    pub connection: ConnLimits,
    pub request: ReqLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            backlog: 10,

            document_root: PathBuf::from("webroot"),
            default_document: String::from("index.html"),
            storage_dir: PathBuf::from("uploads"),
            not_found_page: PathBuf::from("404_show.html"),

            redirects: vec![RedirectRule {
                from: String::from("webroot/redirect"),
                to: String::from("webroot/index.html"),
            }],
            forbidden: vec![String::from("webroot/forbidden")],

            connection: ConnLimits::default(),
            request: ReqLimits::default(),
        }
    }
}

impl Config {
    #[inline]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Checks the semantic constraints serde cannot express.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.backlog <= 0 {
            errors.push(ValidationError::new("backlog", "must be positive"));
        }
        if self.default_document.is_empty() {
            errors.push(ValidationError::new("default_document", "must not be empty"));
        }

        for (i, rule) in self.redirects.iter().enumerate() {
            if rule.from.is_empty() {
                errors.push(ValidationError::new(
                    format!("redirects[{i}].from"),
                    "must not be empty",
                ));
            }
        }
        for (i, entry) in self.forbidden.iter().enumerate() {
            if entry.is_empty() {
                errors.push(ValidationError::new(
                    format!("forbidden[{i}]"),
                    "must not be empty",
                ));
            }
        }

        let conn = &self.connection;
        for (field, value) in [
            ("connection.socket_read_timeout", conn.socket_read_timeout),
            ("connection.socket_write_timeout", conn.socket_write_timeout),
            ("connection.upload_idle_timeout", conn.upload_idle_timeout),
        ] {
            if value.is_zero() {
                errors.push(ValidationError::new(field, "must be positive"));
            }
        }

        let req = &self.request;
        for (field, value) in [
            ("request.buffer_size", req.buffer_size),
            ("request.upload_chunk_size", req.upload_chunk_size),
            ("request.max_upload_size", req.max_upload_size),
        ] {
            if value == 0 {
                errors.push(ValidationError::new(field, "must be positive"));
            }
        }
        if req.upload_chunk_size > req.max_upload_size {
            errors.push(ValidationError::new(
                "request.upload_chunk_size",
                "must not exceed request.max_upload_size",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate().map_err(ConfigError::Validation)?;

    Ok(config)
}
