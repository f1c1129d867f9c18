//! HTTP/1.1 response builder with exact `Content-Length` bookkeeping.

use crate::{http::types::StatusCode, WriteBuffer};

const DEFAULT_CAPACITY: usize = 256;
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug)]
/// HTTP response builder for constructing server responses.
///
/// Build responses by chaining methods in strict order:
/// [`status()`](Response::status) or [`status_reason()`](Response::status_reason)
/// -> headers -> [`body()`](Response::body).
///
/// The `Content-Length` header is written by [`body()`](Response::body) and
/// always equals the number of body bytes. A `Connection: close` header
/// requested with [`close()`](Response::close) follows it.
///
/// # Examples
/// ```
/// use webroot::{Response, StatusCode};
///
/// let mut resp = Response::new();
/// resp.status(StatusCode::Ok)
///     .header("Content-Type", "text/html; charset=utf-8")
///     .close()
///     .body("<h1>Hello World</h1>");
///
/// assert!(resp.buffer().starts_with(b"HTTP/1.1 200 OK\r\n"));
/// ```
///
/// # Panics
/// All methods perform validity checks in `debug` mode that panic on violations.
pub struct Response {
    buffer: Vec<u8>,
    close: bool,
    state: ResponseState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResponseState {
    Clean,
    Headers,
    Complete,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[inline]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(DEFAULT_CAPACITY),
            close: false,
            state: ResponseState::Clean,
        }
    }

    /// Serialized response, ready to be written to the socket.
    #[inline(always)]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

// Shapes used by the router
impl Response {
    /// `HTTP/1.1 <code> OK` with a plain-text body.
    ///
    /// # Examples
    /// ```
    /// use webroot::{Response, StatusCode};
    ///
    /// let resp = Response::success(StatusCode::Ok, "6");
    /// assert_eq!(
    ///     resp.buffer(),
    ///     b"HTTP/1.1 200 OK\r\n\
    ///       Content-Type: text/plain; charset=utf-8\r\n\
    ///       Content-Length: 1\r\n\r\n6"
    /// );
    /// ```
    #[inline]
    pub fn success<T: WriteBuffer>(status: StatusCode, body: T) -> Self {
        let mut resp = Self::new();
        resp.status_reason(status, "OK")
            .header("Content-Type", TEXT_PLAIN)
            .body(body);
        resp
    }

    /// `HTTP/1.1 <code> Error` with a plain-text message.
    ///
    /// The reason word is always `Error`, whatever the code.
    #[inline]
    pub fn error<T: WriteBuffer>(status: StatusCode, message: T) -> Self {
        let mut resp = Self::new();
        resp.status_reason(status, "Error")
            .header("Content-Type", TEXT_PLAIN)
            .body(message);
        resp
    }

    /// `HTTP/1.1 302 Found` with an empty body.
    #[inline]
    pub fn redirect<T: WriteBuffer>(location: T) -> Self {
        let mut resp = Self::new();
        resp.status(StatusCode::Found)
            .header("Location", location)
            .body(b"");
        resp
    }
}

impl Response {
    /// Requests a `Connection: close` header.
    ///
    /// # Panics
    /// Error messages:
    /// - `Must be called before any finalizing method`
    ///
    /// Panics in `debug` mode when called after [`body()`](Response::body).
    #[inline]
    #[track_caller]
    pub fn close(&mut self) -> &mut Self {
        debug_assert!(
            self.state != ResponseState::Complete,
            "Must be called before any finalizing method",
        );

        self.close = true;
        self
    }

    /// Writes the status line with the standard reason phrase.
    ///
    /// # Examples
    /// ```
    /// use webroot::{Response, StatusCode};
    ///
    /// let mut resp = Response::new();
    /// resp.status(StatusCode::NotFound).body("");
    /// assert!(resp.buffer().starts_with(b"HTTP/1.1 404 Not Found\r\n"));
    /// ```
    ///
    /// # Panics
    /// Error messages:
    /// - `Must be first and called only once`
    ///
    /// Panics in `debug` mode when called twice or after a body.
    #[inline]
    #[track_caller]
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Clean,
            "Must be first and called only once"
        );

        self.buffer.extend_from_slice(status.to_first_line());
        self.state = ResponseState::Headers;
        self
    }

    /// Writes the status line with a custom reason word.
    ///
    /// # Panics
    /// Error messages:
    /// - `Must be first and called only once`
    ///
    /// Panics in `debug` mode when called twice or after a body.
    #[inline]
    #[track_caller]
    pub fn status_reason<R: WriteBuffer>(&mut self, status: StatusCode, reason: R) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Clean,
            "Must be first and called only once"
        );

        self.buffer.extend_from_slice(b"HTTP/1.1 ");
        self.buffer.extend_from_slice(status.as_code_bytes());
        self.buffer.push(b' ');
        reason.write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b"\r\n");
        self.state = ResponseState::Headers;
        self
    }

    /// Adds a header to the response.
    ///
    /// PLEASE DO NOT ADD THE FOLLOWING HEADINGS:
    /// - `Content-Length` - calculated automatically
    /// - `Connection` - use [`close()`](Response::close)
    ///
    /// # Panics
    /// Error message: `Must be called after status() and before any body method`
    #[inline]
    #[track_caller]
    pub fn header<N: WriteBuffer, V: WriteBuffer>(&mut self, name: N, value: V) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and before any body method"
        );

        name.write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b": ");
        value.write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b"\r\n");
        self
    }

    /// Sets the response body and finalizes the response.
    ///
    /// # Side Effects
    /// - Writes `Content-Length` (bytes, not characters)
    /// - Writes `Connection: close` if [`close()`](Response::close) was called
    ///
    /// # Panics
    /// Error message: `Must be called after status() and any header methods`
    #[inline]
    #[track_caller]
    pub fn body<T: WriteBuffer>(&mut self, data: T) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and any header methods"
        );

        let mut body = Vec::new();
        data.write_to(&mut body);

        self.buffer.extend_from_slice(b"Content-Length: ");
        body.len().write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b"\r\n");

        if self.close {
            self.buffer.extend_from_slice(b"Connection: close\r\n");
        }

        self.buffer.extend_from_slice(b"\r\n");
        self.buffer.append(&mut body);
        self.state = ResponseState::Complete;
        self
    }

    #[inline]
    const fn number_to_bytes(mut n: u128) -> ([u8; 39], usize) {
        let mut buffer = [b'0'; 39];
        let mut i = 39;

        if n == 0 {
            return (buffer, 38);
        }

        while n > 0 {
            i -= 1;
            buffer[i] = b'0' + (n % 10) as u8;
            n /= 10;
        }

        (buffer, i)
    }
}

pub mod write {
    use super::*;

    /// Trait for writing data to the [`Response`] buffer.
    ///
    /// Implemented for strings, bytes and unsigned integers.
    /// Floating-point numbers are formatted by the caller
    /// (see [`Number`](crate::Number)) to keep their textual form explicit.
    ///
    /// # Example
    /// ```
    /// use webroot::WriteBuffer;
    ///
    /// struct MyString(String);
    ///
    /// impl WriteBuffer for MyString {
    ///     fn write_to(&self, buffer: &mut Vec<u8>) {
    ///         buffer.extend_from_slice(self.0.as_bytes())
    ///     }
    /// }
    /// ```
    pub trait WriteBuffer {
        /// Writes the value's representation directly to the buffer.
        fn write_to(&self, buffer: &mut Vec<u8>);
    }

    macro_rules! impl_write_buffer {
        (bytes, $conn:expr => $($t:ty),*) => {
            $(impl WriteBuffer for $t {
                #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                    let closure = $conn;
                    closure(self, buffer);
                }
            })*
        };
        (number($type:ty), $conn:expr => $($t:ty),*) => {
            $(impl WriteBuffer for $t {
                #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                    $conn(*self as $type, buffer);
                }
            })*
        };
    }

    impl<T: WriteBuffer + ?Sized> WriteBuffer for &T {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            T::write_to(*self, buffer);
        }
    }
    impl WriteBuffer for str {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(self.as_bytes());
        }
    }
    impl WriteBuffer for [u8] {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(self);
        }
    }
    impl_write_buffer! {
        bytes, |value: &str, buffer: &mut Vec<u8>| {
            buffer.extend_from_slice(value.as_bytes());
        } => String
    }
    impl_write_buffer! {
        bytes, |value: &[u8], buffer: &mut Vec<u8>| {
            buffer.extend_from_slice(value);
        } => Vec<u8>
    }
    impl<const N: usize> WriteBuffer for [u8; N] {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(self);
        }
    }
    impl_write_buffer! {
        number(u128), impl_write_buffer_u128 => u8, u16, u32, u64, u128, usize
    }

    #[inline(always)]
    fn impl_write_buffer_u128(value: u128, buffer: &mut Vec<u8>) {
        let (arr, start) = Response::number_to_bytes(value);
        buffer.extend_from_slice(&arr[start..]);
    }
}


#[cfg(test)]
mod status_tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn basic() {
        #[rustfmt::skip]
        let cases = [
            (StatusCode::Ok,                   "HTTP/1.1 200 OK\r\n"),
            (StatusCode::Found,                "HTTP/1.1 302 Found\r\n"),
            (StatusCode::NotFound,             "HTTP/1.1 404 Not Found\r\n"),
            (StatusCode::UnsupportedMediaType, "HTTP/1.1 415 Unsupported Media Type\r\n"),
        ];

        for (status, expected) in cases {
            let mut resp = Response::new();
            resp.status(status);

            assert_eq!(str_op(resp.buffer()), expected);
            assert_eq!(resp.state, ResponseState::Headers);
        }
    }

    #[test]
    fn custom_reason() {
        let mut resp = Response::new();
        resp.status_reason(StatusCode::Forbidden, "Error");

        assert_eq!(str_op(resp.buffer()), "HTTP/1.1 403 Error\r\n");
    }

    #[test]
    #[should_panic(expected = "Must be first and called only once")]
    fn double_call() {
        Response::new()
            .status(StatusCode::Ok)
            .status(StatusCode::Ok);
    }

    #[test]
    #[should_panic(expected = "Must be first and called only once")]
    fn reason_after_status() {
        Response::new()
            .status(StatusCode::Ok)
            .status_reason(StatusCode::Ok, "OK");
    }
}

#[cfg(test)]
mod header_tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn basic() {
        #[rustfmt::skip]
        let cases: [(&str, Box<dyn Fn(&mut Response)>); 4] = [
            ("Location: /index.html\r\n", Box::new(|r| { r.header("Location", "/index.html"); })),
            ("X-Port: 8080\r\n",          Box::new(|r| { r.header("X-Port", 8080u16); })),
            ("X-Size: 4096\r\n",          Box::new(|r| { r.header("X-Size", 4096usize); })),
            ("X-Owned: yes\r\n",          Box::new(|r| { r.header(String::from("X-Owned"), String::from("yes")); })),
        ];

        for (expected, write) in cases {
            let mut resp = Response::new();
            resp.status(StatusCode::Ok);
            write(&mut resp);

            assert_eq!(
                str_op(resp.buffer()),
                format!("HTTP/1.1 200 OK\r\n{expected}")
            );
        }
    }

    #[test]
    #[should_panic(expected = "Must be called after status() and before any body method")]
    fn header_before_status() {
        Response::new().header("Name", "Value");
    }

    #[test]
    #[should_panic(expected = "Must be called after status() and before any body method")]
    fn header_after_body() {
        let mut resp = Response::new();
        resp.status(StatusCode::Ok).body("");
        resp.header("Name", "Value");
    }
}
