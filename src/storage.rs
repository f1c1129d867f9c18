//! File-system collaborators: the document root and the upload storage.

use crate::errors::ErrorKind;
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Read-only view of the directory static files are served from.
///
/// Every lookup is confined to the root: the candidate path is canonicalized
/// (symlinks followed) and must stay below the canonical root.
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    root: PathBuf,
    prefix: String,
}

impl DocumentRoot {
    /// Opens `path` as a document root.
    ///
    /// # Errors
    /// Fails when `path` does not exist or is not a directory.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let root = std::fs::canonicalize(path)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }

        let prefix = match root.file_name() {
            Some(name) => format!("{}/", name.to_string_lossy()),
            None => String::from("/"),
        };

        Ok(Self { root, prefix })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Root directory name followed by `/`, e.g. `webroot/`.
    ///
    /// Resources starting with it name files relative to the root's parent.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Reads the regular file at `resource` (relative to the root).
    ///
    /// `Ok(None)` when the file is missing, is not a regular file, or
    /// resolves outside the root.
    pub async fn read(&self, resource: &str) -> Result<Option<Vec<u8>>, ErrorKind> {
        let path = match self.confine(resource).await {
            Some(path) => path,
            None => return Ok(None),
        };

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Ok(None),
        }

        let data = fs::read(&path).await.map_err(ErrorKind::storage)?;
        Ok(Some(data))
    }

    async fn confine(&self, resource: &str) -> Option<PathBuf> {
        let canonical = fs::canonicalize(self.root.join(resource)).await.ok()?;

        canonical.starts_with(&self.root).then_some(canonical)
    }
}

/// Directory uploaded files are written to and downloaded from.
///
/// File names are plain names only, never paths.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// The directory is created lazily, on the first write.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of `name` inside the storage directory.
    ///
    /// # Errors
    /// [`ErrorKind::InvalidFileName`] for an empty name, `.`, `..`, or a
    /// name containing `/` or `\`.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ErrorKind> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ErrorKind::InvalidFileName(name.to_owned()));
        }

        Ok(self.dir.join(name))
    }

    /// Stored bytes of `name`, `Ok(None)` if nothing was stored under it.
    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, ErrorKind> {
        let path = self.resolve(name)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ErrorKind::storage(err)),
        }
    }

    /// Writes `data` under `name`, replacing any previous file.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<PathBuf, ErrorKind> {
        let path = self.resolve(name)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(ErrorKind::storage)?;
        fs::write(&path, data).await.map_err(ErrorKind::storage)?;

        Ok(path)
    }
}

#[cfg(test)]
mod document_root_tests {
    use super::*;

    fn root() -> (tempfile::TempDir, DocumentRoot) {
        let dir = tempfile::tempdir().unwrap();
        let web = dir.path().join("webroot");

        std::fs::create_dir_all(web.join("css")).unwrap();
        std::fs::write(web.join("index.html"), "<h1>index</h1>").unwrap();
        std::fs::write(web.join("css/site.css"), "body {}").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();

        let root = DocumentRoot::open(&web).unwrap();
        (dir, root)
    }

    #[tokio::test]
    async fn read() {
        let (_dir, root) = root();

        #[rustfmt::skip]
        let cases: [(&str, Option<&[u8]>); 7] = [
            ("index.html",              Some(b"<h1>index</h1>")),
            ("css/site.css",            Some(b"body {}")),
            ("./css/../index.html",     Some(b"<h1>index</h1>")),
            ("missing.html",            None),
            ("css",                     None),
            ("../secret.txt",           None),
            ("css/../../secret.txt",    None),
        ];

        for (resource, expected) in cases {
            assert_eq!(
                root.read(resource).await.unwrap().as_deref(),
                expected,
                "{resource}"
            );
        }
    }

    #[test]
    fn prefix() {
        let (_dir, root) = root();
        assert_eq!(root.prefix(), "webroot/");
    }

    #[test]
    fn open_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DocumentRoot::open(dir.path().join("nope")).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escape() {
        let (dir, root) = root();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.path().join("link.txt"))
            .unwrap();

        assert_eq!(root.read("link.txt").await.unwrap(), None);
    }
}

#[cfg(test)]
mod upload_store_tests {
    use super::*;

    #[test]
    fn resolve() {
        let store = UploadStore::new("uploads");

        assert_eq!(store.resolve("a.bin"), Ok(PathBuf::from("uploads/a.bin")));
        assert_eq!(store.resolve("..hidden"), Ok(PathBuf::from("uploads/..hidden")));

        for name in ["", ".", "..", "../etc/passwd", "a/b", "a\\b"] {
            assert_eq!(
                store.resolve(name),
                Err(ErrorKind::InvalidFileName(name.to_owned())),
                "{name:?}"
            );
        }
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("nested/uploads"));

        assert_eq!(store.read("f.bin").await, Ok(None));

        store.write("f.bin", &[0, 1, 2, 255]).await.unwrap();
        assert_eq!(store.read("f.bin").await, Ok(Some(vec![0, 1, 2, 255])));

        store.write("f.bin", b"new").await.unwrap();
        assert_eq!(store.read("f.bin").await, Ok(Some(b"new".to_vec())));
    }

    #[tokio::test]
    async fn directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "").unwrap();
        let store = UploadStore::new(&blocked);

        let write = store.write("f.bin", b"data").await.unwrap_err();
        assert!(matches!(write, ErrorKind::Storage(_)), "{write:?}");

        let read = store.read("f.bin").await.unwrap_err();
        assert!(matches!(read, ErrorKind::Storage(_)), "{read:?}");
    }
}
