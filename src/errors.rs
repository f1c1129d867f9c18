use crate::StatusCode;
use std::{fmt, io};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("request line must consist of exactly three tokens")]
    MalformedRequestLine,

    #[error("numeral expected in {0:?}")]
    InvalidNumber(String),
    #[error("arithmetic overflow")]
    Overflow,
    #[error("expected two query parameters, found {found}")]
    MissingParameter { found: usize },

    #[error("upload target carries no file name")]
    MissingFileName,
    #[error("file name {0:?} is not a plain file name")]
    InvalidFileName(String),
    #[error("upload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// File-system failure in the document root or the upload storage.
    #[error("storage failure: {0}")]
    Storage(IoError),
    /// Failure on the client socket itself.
    #[error("{0}")]
    Io(IoError),
}

macro_rules! http_errors {
    ($($name:ident: $status:ident, $code:literal, $len:literal => $message:literal; )*) => {
        /// Ready-made response, byte-identical to
        /// [`Response::error`](crate::Response::error) with the same status and message.
        pub(crate) const fn as_http(&self) -> &'static [u8] {
            match self { $(
                Self::$name { .. } => concat!(
                    "HTTP/1.1 ", $code, " Error\r\n",
                    "Content-Type: text/plain; charset=utf-8\r\n",
                    "Content-Length: ", $len, "\r\n",
                    "\r\n",
                    $message
                ),
            )* }.as_bytes()
        }

        pub(crate) const fn status(&self) -> StatusCode {
            match self { $(
                Self::$name { .. } => StatusCode::$status,
            )* }
        }

        #[allow(dead_code)]
        pub(crate) const fn message(&self) -> &'static str {
            match self { $(
                Self::$name { .. } => $message,
            )* }
        }
    };
}

impl ErrorKind {
    http_errors! {
        MalformedRequestLine: BadRequest, "400", "17" => "Malformed Request";

        InvalidNumber: InternalServerError, "500", "21" => "Internal Server Error";
        Overflow: InternalServerError, "500", "21" => "Internal Server Error";
        MissingParameter: InternalServerError, "500", "21" => "Internal Server Error";

        MissingFileName: InternalServerError, "500", "21" => "Internal Server Error";
        InvalidFileName: BadRequest, "400", "11" => "Bad Request";
        PayloadTooLarge: PayloadTooLarge, "413", "17" => "Payload Too Large";

        Storage: InternalServerError, "500", "21" => "Internal Server Error";
        Io: InternalServerError, "500", "21" => "Internal Server Error";
    }

    /// Wraps a file-system error, keeping it apart from socket errors.
    #[inline]
    pub(crate) fn storage(err: io::Error) -> Self {
        ErrorKind::Storage(IoError(err))
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

#[derive(Debug)]
pub struct IoError(pub(crate) io::Error);

impl IoError {
    #[inline]
    pub fn kind(&self) -> io::ErrorKind {
        self.0.kind()
    }
}

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I/O error: {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tools::*, Response};

    fn all() -> Vec<ErrorKind> {
        vec![
            ErrorKind::MalformedRequestLine,
            ErrorKind::InvalidNumber(String::from("number=")),
            ErrorKind::Overflow,
            ErrorKind::MissingParameter { found: 1 },
            ErrorKind::MissingFileName,
            ErrorKind::InvalidFileName(String::from("../secret")),
            ErrorKind::PayloadTooLarge { limit: 1024 },
            ErrorKind::storage(io::Error::new(io::ErrorKind::PermissionDenied, "read-only")),
            ErrorKind::from(io::Error::new(io::ErrorKind::TimedOut, "read timeout")),
        ]
    }

    #[test]
    fn canned_matches_builder() {
        for err in all() {
            let built = Response::error(err.status(), err.message());
            assert_eq!(str_op(err.as_http()), str_op(built.buffer()), "{err:?}");
        }
    }

    #[test]
    fn malformed_request_line() {
        assert_eq!(
            str_op(ErrorKind::MalformedRequestLine.as_http()),
            "HTTP/1.1 400 Error\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Length: 17\r\n\r\n\
             Malformed Request"
        );
    }

    #[test]
    fn io_equality_by_kind() {
        let a = ErrorKind::from(io::Error::new(io::ErrorKind::NotFound, "a"));
        let b = ErrorKind::from(io::Error::new(io::ErrorKind::NotFound, "b"));
        let c = ErrorKind::from(io::Error::new(io::ErrorKind::TimedOut, "a"));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn storage_is_not_socket_io() {
        let storage = ErrorKind::storage(io::Error::new(io::ErrorKind::NotFound, "a"));
        let socket = ErrorKind::from(io::Error::new(io::ErrorKind::NotFound, "a"));

        assert_ne!(storage, socket);
        assert_eq!(storage.status(), StatusCode::InternalServerError);
        assert_eq!(
            str_op(storage.as_http()),
            "HTTP/1.1 500 Error\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Length: 21\r\n\r\n\
             Internal Server Error"
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            ErrorKind::InvalidNumber(String::from("abc")).to_string(),
            "numeral expected in \"abc\""
        );
        assert_eq!(
            ErrorKind::PayloadTooLarge { limit: 8 }.to_string(),
            "upload exceeds the limit of 8 bytes"
        );
    }
}
