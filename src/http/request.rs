use crate::{
    errors::ErrorKind,
    http::types::{self, Header},
    limits::ReqLimits,
    Method,
};
use memchr::memmem;
use std::{borrow::Cow, io, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::sleep,
};

/// A request as read from the socket in one bounded read.
///
/// # Input data
///
/// - `SP`: any ASCII whitespace
/// - `CRLF`: `"\r\n"`
///
/// ```text
/// [METHOD] SP [TARGET] SP [VERSION] CRLF
/// ([NAME] ":" [VALUE] CRLF)*
/// CRLF
/// [BODY]
/// ```
///
/// The head ends at the first `CRLF CRLF`; without one the whole input is the
/// head and the body is empty. The head is decoded as UTF-8, invalid
/// sequences are replaced with `U+FFFD`. The body is kept as raw bytes.
///
/// The request line must split into exactly three tokens, otherwise parsing
/// fails with [`ErrorKind::MalformedRequestLine`]. Header lines without a `:`
/// are skipped; values are trimmed.
///
/// The target is kept verbatim, query string included.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    target: String,
    version: String,

    headers: Vec<Header>,
    body: Vec<u8>,
}

impl Request {
    #[inline(always)]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Raw request target, e.g. `/calculate-next?number=5`.
    #[inline(always)]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline(always)]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline(always)]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// `Content-Length` if present and a valid decimal number.
    pub fn content_length(&self) -> Option<usize> {
        types::slice_to_usize(self.header("Content-Length")?.as_bytes())
    }

    /// Body bytes received together with the head.
    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Checks that the method is `GET` or `POST` and the target starts with `/`.
    ///
    /// Returns the verdict and the target without its leading `/`
    /// (the whole target when there is none).
    ///
    /// # Examples
    /// ```
    /// # use webroot::{Request, Method};
    /// let req = Request::new(Method::Get, "/index.html", "HTTP/1.1");
    /// assert_eq!(req.validate_target(), (true, "index.html"));
    ///
    /// let req = Request::new(Method::Get, "index.html", "HTTP/1.1");
    /// assert_eq!(req.validate_target(), (false, "index.html"));
    /// ```
    pub fn validate_target(&self) -> (bool, &str) {
        let method_ok = matches!(self.method, Method::Get | Method::Post);

        match self.target.strip_prefix('/') {
            Some(resource) => (method_ok, resource),
            None => (false, self.target.as_str()),
        }
    }
}

impl Request {
    /// Builds a request without headers or body.
    pub fn new<T: Into<String>, V: Into<String>>(method: Method, target: T, version: V) -> Self {
        Self {
            method,
            target: target.into(),
            version: version.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }
}

impl Request {
    fn parse_head(head: &str, body: &[u8]) -> Result<Self, ErrorKind> {
        let mut lines = head.split("\r\n");

        let mut tokens = lines.next().unwrap_or_default().split_whitespace();
        let (method, target, version) = match (
            tokens.next(),
            tokens.next(),
            tokens.next(),
            tokens.next(),
        ) {
            (Some(method), Some(target), Some(version), None) => (method, target, version),
            _ => return Err(ErrorKind::MalformedRequestLine),
        };

        let headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some(Header::new(name, value.trim()))
            })
            .collect();

        Ok(Self {
            method: Method::from_bytes(method.as_bytes()),
            target: target.to_owned(),
            version: version.to_owned(),
            headers,
            body: body.to_vec(),
        })
    }
}

//

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Parser {
    len: usize,
    buffer: Box<[u8]>,
}

impl Parser {
    #[inline(always)]
    pub(crate) fn new(limits: &ReqLimits) -> Self {
        let buffer = vec![0; limits.buffer_size].into_boxed_slice();

        Parser { len: 0, buffer }
    }

    #[inline]
    // For tests
    #[cfg(test)]
    pub(crate) fn from<V: AsRef<[u8]>>(limits: &ReqLimits, value: V) -> Self {
        let mut parser = Self::new(limits);

        let value = value.as_ref();
        parser.buffer[0..value.len()].copy_from_slice(value);
        parser.len = value.len();

        parser
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.len = 0;
        self.buffer.fill(0);
    }
}

impl Parser {
    /// Performs the single bounded read of a request.
    ///
    /// Returns the number of bytes read, `0` when the peer closed the stream.
    #[inline]
    pub(crate) async fn fill_buffer<S: AsyncRead + Unpin>(
        &mut self,
        stream: &mut S,
        time: Duration,
    ) -> Result<usize, io::Error> {
        tokio::select! {
            biased;

            read_result = stream.read(&mut self.buffer) => {
                let n = read_result?;
                self.len = n;
                Ok(n)
            }
            _ = sleep(time) => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout"))
            },
        }
    }

    pub(crate) fn parse(&self) -> Result<Request, ErrorKind> {
        let data = &self.buffer[..self.len];

        let (head, body) = match memmem::find(data, b"\r\n\r\n") {
            Some(end) => (&data[..end], &data[end + 4..]),
            None => (data, &[][..]),
        };

        Request::parse_head(&Self::decode(head), body)
    }

    #[inline]
    fn decode(head: &[u8]) -> Cow<'_, str> {
        match simdutf8::basic::from_utf8(head) {
            Ok(value) => Cow::Borrowed(value),
            Err(_) => String::from_utf8_lossy(head),
        }
    }
}
