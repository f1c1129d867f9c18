//! Content type lookup by file extension.

use crate::StatusCode;

/// Media types the server knows how to label.
///
/// Anything outside the table is served as [`MediaType::Unknown`]:
/// `application/octet-stream` with status `415`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// `html` and `txt`
    Html,
    Jpeg,
    Javascript,
    Css,
    Icon,
    Unknown,
}

impl MediaType {
    /// Resolves the media type from the text after the last `.` of `path`.
    ///
    /// The extension is compared case-insensitively. A path without any `.`
    /// is looked up as a whole.
    ///
    /// # Examples
    /// ```
    /// use webroot::MediaType;
    ///
    /// assert_eq!(MediaType::from_path("webroot/index.HTML"), MediaType::Html);
    /// assert_eq!(MediaType::from_path("archive.tar.gz"), MediaType::Unknown);
    /// ```
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or(path);

        match ext.to_ascii_lowercase().as_str() {
            "html" | "txt" => MediaType::Html,
            "jpg" => MediaType::Jpeg,
            "js" => MediaType::Javascript,
            "css" => MediaType::Css,
            "ico" => MediaType::Icon,
            _ => MediaType::Unknown,
        }
    }

    #[inline]
    pub const fn content_type(self) -> &'static str {
        match self {
            MediaType::Html => "text/html; charset=utf-8",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Javascript => "application/javascript; charset=UTF-8",
            MediaType::Css => "text/css",
            MediaType::Icon => "image/x-icon",
            MediaType::Unknown => "application/octet-stream",
        }
    }

    /// Status sent with a static file of this type.
    #[inline]
    pub const fn status(self) -> StatusCode {
        match self {
            MediaType::Unknown => StatusCode::UnsupportedMediaType,
            _ => StatusCode::Ok,
        }
    }
}
