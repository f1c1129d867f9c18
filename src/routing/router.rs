//! Request dispatch.
//!
//! The router is immutable after construction and shared by reference with
//! every connection. Each request is turned into exactly one [`RouteDecision`].
//!
//! Resource rules are plain substring matches over the request target and are
//! tried in a fixed order, first match wins:
//!
//! 1. redirect table
//! 2. forbidden list
//! 3. `calculate-next`
//! 4. `calculate-area`
//! 5. static file

use crate::{
    config::{Config, ConfigError, RedirectRule},
    errors::ErrorKind,
    routing::number::Number,
    storage::{DocumentRoot, UploadStore},
    MediaType, Method, Request, Response, StatusCode,
};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// `302` to the given location.
    Redirect(String),
    Forbidden,
    /// `200` with the formatted result.
    Calculation(String),
    StaticFile {
        body: Vec<u8>,
        media: MediaType,
    },
    NotFound(&'static str),
    BadRequest,
    /// Read the upload payload from the client and store it.
    StoreFromClient {
        file_name: String,
    },
    /// Send a stored file back to the client.
    ServeToClient {
        file_name: String,
    },
    ServerError,
}

impl RouteDecision {
    /// Response for every decision that does not need the client stream.
    ///
    /// `None` for [`StoreFromClient`](RouteDecision::StoreFromClient) and
    /// [`ServeToClient`](RouteDecision::ServeToClient).
    pub fn into_response(self) -> Option<Response> {
        let resp = match self {
            RouteDecision::Redirect(location) => Response::redirect(location),
            RouteDecision::Forbidden => Response::error(StatusCode::Forbidden, "Forbidden"),
            RouteDecision::Calculation(text) => Response::success(StatusCode::Ok, text),
            RouteDecision::StaticFile { body, media } => {
                let mut resp = Response::new();
                resp.status(media.status())
                    .header("Content-Type", media.content_type())
                    .close()
                    .body(body);
                resp
            }
            RouteDecision::NotFound(message) => Response::error(StatusCode::NotFound, message),
            RouteDecision::BadRequest => Response::error(StatusCode::BadRequest, "Bad Request"),
            RouteDecision::ServerError => {
                Response::error(StatusCode::InternalServerError, "Internal Server Error")
            }
            RouteDecision::StoreFromClient { .. } | RouteDecision::ServeToClient { .. } => {
                return None
            }
        };

        Some(resp)
    }
}

#[derive(Debug)]
pub struct Router {
    redirects: Vec<RedirectRule>,
    forbidden: Vec<String>,

    root: DocumentRoot,
    default_document: String,

    store: UploadStore,
    not_found_page: PathBuf,
}

impl Router {
    /// Router with empty rule tables, serving `index.html` for `/`.
    pub fn new(root: DocumentRoot, store: UploadStore) -> Self {
        Self {
            redirects: Vec::new(),
            forbidden: Vec::new(),
            root,
            default_document: String::from("index.html"),
            store,
            not_found_page: PathBuf::from("404_show.html"),
        }
    }

    /// Builds the router described by `config`.
    ///
    /// # Errors
    /// [`ConfigError::Io`] when the document root cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let root = DocumentRoot::open(&config.document_root).map_err(|source| ConfigError::Io {
            path: config.document_root.clone(),
            source,
        })?;

        let mut router = Self::new(root, UploadStore::new(&config.storage_dir))
            .default_document(&config.default_document)
            .not_found_page(&config.not_found_page);

        router.redirects.extend(config.redirects.iter().cloned());
        for entry in &config.forbidden {
            router = router.forbid(entry);
        }

        Ok(router)
    }

    /// Appends a redirect rule; earlier rules take precedence.
    pub fn redirect<F: Into<String>, T: Into<String>>(mut self, from: F, to: T) -> Self {
        self.redirects.push(RedirectRule {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn forbid<S: Into<String>>(mut self, entry: S) -> Self {
        self.forbidden.push(entry.into());
        self
    }

    pub fn default_document<S: Into<String>>(mut self, document: S) -> Self {
        self.default_document = document.into();
        self
    }

    /// Page sent as the body of a `404` from the download route.
    pub fn not_found_page<P: Into<PathBuf>>(mut self, page: P) -> Self {
        self.not_found_page = page.into();
        self
    }

    #[inline]
    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    #[inline]
    pub fn not_found_page_path(&self) -> &Path {
        &self.not_found_page
    }
}

impl Router {
    /// Routes one request.
    ///
    /// Errors raised while dispatching are logged and answered with
    /// [`RouteDecision::ServerError`]; their text never reaches the client.
    pub async fn route(&self, req: &Request) -> RouteDecision {
        debug!(method = ?req.method(), uri = req.target(), "routing request");

        match self.dispatch(req).await {
            Ok(decision) => decision,
            Err(err) => {
                error!(uri = req.target(), error = %err, "error processing request");
                RouteDecision::ServerError
            }
        }
    }

    async fn dispatch(&self, req: &Request) -> Result<RouteDecision, ErrorKind> {
        let target = req.target();

        match req.method() {
            Method::Post if target.contains("/upload") => {
                let file_name = target
                    .split('?')
                    .nth(1)
                    .and_then(|query| query.split('=').nth(1))
                    .ok_or(ErrorKind::MissingFileName)?;

                Ok(RouteDecision::StoreFromClient {
                    file_name: file_name.to_owned(),
                })
            }
            Method::Post => Ok(RouteDecision::NotFound("Not Found")),
            Method::Get if target.contains("/image") => {
                let file_name = target.rsplit('=').next().unwrap_or(target);

                Ok(RouteDecision::ServeToClient {
                    file_name: file_name.to_owned(),
                })
            }
            Method::Get => match req.validate_target() {
                (true, resource) => self.resource(resource).await,
                (false, _) => Ok(RouteDecision::BadRequest),
            },
            Method::Other => Ok(RouteDecision::BadRequest),
        }
    }

    async fn resource(&self, resource: &str) -> Result<RouteDecision, ErrorKind> {
        if let Some(rule) = self.redirects.iter().find(|r| resource.contains(&r.from)) {
            return Ok(RouteDecision::Redirect(format!("/{}", rule.to)));
        }

        if self.forbidden.iter().any(|f| resource.contains(f.as_str())) {
            return Ok(RouteDecision::Forbidden);
        }

        if resource.contains("calculate-next") {
            let query = resource.rsplit('?').next().unwrap_or(resource);
            let result = Number::extract(query)?.next()?;

            return Ok(RouteDecision::Calculation(result.to_string()));
        }

        if resource.contains("calculate-area") {
            let query = resource.rsplit('?').next().unwrap_or(resource);
            let params: Vec<&str> = query.split('&').collect();

            let (height, width) = match params.as_slice() {
                [height, width, ..] => (value_of(height), value_of(width)),
                _ => return Err(ErrorKind::MissingParameter { found: params.len() }),
            };
            let area = Number::half_product(Number::extract(height)?, Number::extract(width)?);

            return Ok(RouteDecision::Calculation(area.to_string()));
        }

        self.static_file(resource).await
    }

    async fn static_file(&self, resource: &str) -> Result<RouteDecision, ErrorKind> {
        let path = resource.split('?').next().unwrap_or(resource);
        let path = path.strip_prefix(self.root.prefix()).unwrap_or(path);
        let path = match path.trim_start_matches('/') {
            "" => self.default_document.as_str(),
            path => path,
        };

        match self.root.read(path).await? {
            Some(body) => Ok(RouteDecision::StaticFile {
                body,
                media: MediaType::from_path(path),
            }),
            None => Ok(RouteDecision::NotFound("File Not Found")),
        }
    }
}

// Value of a `name=value` parameter: the text after the last `=`.
#[inline]
fn value_of(param: &str) -> &str {
    param.rsplit('=').next().unwrap_or(param)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{tools::*, Header};

    pub(crate) struct Site {
        pub(crate) dir: tempfile::TempDir,
        pub(crate) router: Router,
    }

    pub(crate) fn site() -> Site {
        let dir = tempfile::tempdir().unwrap();
        let web = dir.path().join("webroot");

        std::fs::create_dir_all(web.join("forbidden")).unwrap();
        std::fs::write(web.join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(web.join("about.html"), "<h1>about</h1>").unwrap();
        std::fs::write(web.join("forbidden/secret.html"), "secret").unwrap();
        std::fs::write(web.join("data.bin"), [0u8, 1, 2]).unwrap();
        std::fs::write(web.join("logo.jpg"), [255u8, 216, 255]).unwrap();

        let router = Router::new(
            DocumentRoot::open(&web).unwrap(),
            UploadStore::new(dir.path().join("uploads")),
        )
        .redirect("webroot/redirect", "webroot/index.html")
        .forbid("webroot/forbidden")
        .not_found_page(dir.path().join("404_show.html"));

        Site { dir, router }
    }

    fn get(target: &str) -> Request {
        Request::new(Method::Get, target, "HTTP/1.1")
    }

    fn post(target: &str) -> Request {
        Request::new(Method::Post, target, "HTTP/1.1")
    }

    #[tokio::test]
    async fn method_dispatch() {
        let site = site();

        #[rustfmt::skip]
        let cases = [
            (post("/upload?name=a.bin"),     RouteDecision::StoreFromClient { file_name: "a.bin".into() }),
            (post("/api/upload?file=x=y"),   RouteDecision::StoreFromClient { file_name: "x".into() }),
            (post("/upload"),                RouteDecision::ServerError),
            (post("/upload?name"),           RouteDecision::ServerError),
            (post("/submit"),                RouteDecision::NotFound("Not Found")),
            (get("/image?name=a.bin"),       RouteDecision::ServeToClient { file_name: "a.bin".into() }),
            (get("/image"),                  RouteDecision::ServeToClient { file_name: "/image".into() }),
            (get("index.html"),              RouteDecision::BadRequest),
            (Request::new(Method::Other, "/index.html", "HTTP/1.1"), RouteDecision::BadRequest),
        ];

        for (req, expected) in cases {
            assert_eq!(site.router.route(&req).await, expected, "{}", req.target());
        }
    }

    #[tokio::test]
    async fn redirect_and_forbidden() {
        let site = site();

        #[rustfmt::skip]
        let cases = [
            ("/webroot/redirect",                 RouteDecision::Redirect("/webroot/index.html".into())),
            ("/x/webroot/redirect/y?q=1",         RouteDecision::Redirect("/webroot/index.html".into())),
            ("/webroot/forbidden/secret.html",    RouteDecision::Forbidden),
            ("/webroot/forbidden/webroot/redirect", RouteDecision::Redirect("/webroot/index.html".into())),
            ("/webroot/forbiddenx",               RouteDecision::Forbidden),
        ];

        for (target, expected) in cases {
            assert_eq!(site.router.route(&get(target)).await, expected, "{target}");
        }
    }

    #[tokio::test]
    async fn calculations() {
        let site = site();

        #[rustfmt::skip]
        let cases = [
            ("/calculate-next?number=5",             RouteDecision::Calculation("6".into())),
            ("/calculate-next?number=-5",            RouteDecision::Calculation("6".into())),
            ("/calculate-next?number=2.5",           RouteDecision::Calculation("3.5".into())),
            ("/calculate-next5",                     RouteDecision::Calculation("6".into())),
            ("/calculate-next?number=",              RouteDecision::ServerError),
            ("/calculate-area?height=4&width=6",     RouteDecision::Calculation("12.0".into())),
            ("/calculate-area?height=3&width=3&x=1", RouteDecision::Calculation("4.5".into())),
            ("/calculate-area?h=1.5&w=2",            RouteDecision::Calculation("1.5".into())),
            ("/calculate-area?height=4",             RouteDecision::ServerError),
            ("/calculate-area?height=4&width=",      RouteDecision::ServerError),
        ];

        for (target, expected) in cases {
            assert_eq!(site.router.route(&get(target)).await, expected, "{target}");
        }
    }

    #[tokio::test]
    async fn static_files() {
        let site = site();
        let home = RouteDecision::StaticFile {
            body: b"<h1>home</h1>".to_vec(),
            media: MediaType::Html,
        };

        #[rustfmt::skip]
        let cases = [
            ("/",                     home.clone()),
            ("//",                    home.clone()),
            ("/index.html",           home.clone()),
            ("/webroot/index.html",   home.clone()),
            ("/index.html?v=2",       home.clone()),
            ("/webroot/",             home.clone()),
            ("/logo.jpg",             RouteDecision::StaticFile { body: vec![255, 216, 255], media: MediaType::Jpeg }),
            ("/data.bin",             RouteDecision::StaticFile { body: vec![0, 1, 2], media: MediaType::Unknown }),
            ("/missing.html",         RouteDecision::NotFound("File Not Found")),
            ("/forbidden",            RouteDecision::NotFound("File Not Found")),
            ("/../404_show.html",     RouteDecision::NotFound("File Not Found")),
        ];

        for (target, expected) in cases {
            assert_eq!(site.router.route(&get(target)).await, expected, "{target}");
        }
    }

    #[tokio::test]
    async fn custom_default_document() {
        let site = site();
        let router = site.router.default_document("about.html");

        assert_eq!(
            router.route(&get("/")).await,
            RouteDecision::StaticFile {
                body: b"<h1>about</h1>".to_vec(),
                media: MediaType::Html,
            }
        );
    }

    #[test]
    fn into_response() {
        #[rustfmt::skip]
        let cases = [
            (RouteDecision::Redirect("/webroot/index.html".into()),
             "HTTP/1.1 302 Found\r\nLocation: /webroot/index.html\r\nContent-Length: 0\r\n\r\n"),
            (RouteDecision::Forbidden,
             "HTTP/1.1 403 Error\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 9\r\n\r\nForbidden"),
            (RouteDecision::Calculation("6".into()),
             "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 1\r\n\r\n6"),
            (RouteDecision::StaticFile { body: b"abc".to_vec(), media: MediaType::Css },
             "HTTP/1.1 200 OK\r\nContent-Type: text/css\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc"),
            (RouteDecision::StaticFile { body: b"abc".to_vec(), media: MediaType::Unknown },
             "HTTP/1.1 415 Unsupported Media Type\r\nContent-Type: application/octet-stream\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc"),
            (RouteDecision::NotFound("File Not Found"),
             "HTTP/1.1 404 Error\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 14\r\n\r\nFile Not Found"),
            (RouteDecision::BadRequest,
             "HTTP/1.1 400 Error\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 11\r\n\r\nBad Request"),
            (RouteDecision::ServerError,
             "HTTP/1.1 500 Error\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 21\r\n\r\nInternal Server Error"),
        ];

        for (decision, expected) in cases {
            let resp = decision.into_response().unwrap();
            assert_eq!(str_op(resp.buffer()), expected);
        }

        assert!(RouteDecision::ServeToClient { file_name: "f".into() }
            .into_response()
            .is_none());
        assert!(RouteDecision::StoreFromClient { file_name: "f".into() }
            .into_response()
            .is_none());
    }

    #[tokio::test]
    async fn headers_do_not_affect_routing() {
        let site = site();
        let req = get("/calculate-next?number=1").with_header(Header::new("Host", "webroot/redirect"));

        assert_eq!(
            site.router.route(&req).await,
            RouteDecision::Calculation("2".into())
        );
    }

    #[tokio::test]
    async fn from_config_rules() {
        let site = site();
        let config = Config {
            document_root: site.dir.path().join("webroot"),
            redirects: vec![
                RedirectRule { from: "old".into(), to: "webroot/about.html".into() },
                RedirectRule { from: "older".into(), to: "webroot/index.html".into() },
            ],
            forbidden: vec!["about".into()],
            ..Config::default()
        };
        let router = Router::from_config(&config).unwrap();

        assert_eq!(router.redirects, config.redirects);
        assert_eq!(
            router.route(&get("/older")).await,
            RouteDecision::Redirect("/webroot/about.html".into())
        );
        assert_eq!(router.route(&get("/about.html")).await, RouteDecision::Forbidden);

        let missing = Config {
            document_root: site.dir.path().join("missing"),
            ..Config::default()
        };
        assert!(matches!(
            Router::from_config(&missing),
            Err(ConfigError::Io { .. })
        ));
    }
}
