//! Restricted static file engine
//!
//! Serves files from the document root for paths no script claims.
//! Restricted means dot files and directories are never exposed: any
//! `/.`-prefixed segment answers 401, as does any path that would resolve
//! outside the document root. Directory requests serve the directory's
//! `index.html`.

use std::path::{Path, PathBuf};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};

use scriptserve_common::error::{EngineError, Result};
use scriptserve_common::http::{status_response, HyperResponse};

/// Static file handler rooted at the document root.
pub struct StaticFiles {
    docroot: PathBuf,
}

impl StaticFiles {
    pub fn new(docroot: impl Into<PathBuf>) -> Self {
        Self {
            docroot: docroot.into(),
        }
    }

    pub fn docroot(&self) -> &Path {
        &self.docroot
    }

    /// Serves the file behind a URL path.
    ///
    /// Dot paths and escapes from the document root are denied, missing
    /// files are not found, and an unreadable stat that is neither gets
    /// the teapot.
    pub async fn serve(&self, path: &str) -> Result<HyperResponse> {
        let clean = normalize(path);
        if clean.split('/').any(|seg| seg.starts_with('.')) {
            return Err(EngineError::Forbidden(clean));
        }

        let mut resolved = self.docroot.join(clean.trim_start_matches('/'));
        if !resolved.starts_with(&self.docroot) {
            return Err(EngineError::Forbidden(clean));
        }

        let metadata = match tokio::fs::metadata(&resolved).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::NotFound(clean));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(EngineError::Forbidden(clean));
            }
            Err(_) => {
                return Ok(status_response(StatusCode::IM_A_TEAPOT));
            }
        };

        if metadata.is_dir() {
            resolved.push("index.html");
        }

        let data = match tokio::fs::read(&resolved).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::NotFound(clean));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(EngineError::Forbidden(clean));
            }
            Err(e) => return Err(EngineError::Io(e)),
        };

        let mut response = Response::new(Full::new(Bytes::from(data)));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, content_type_for(&resolved));
        Ok(response)
    }
}

/// Lexically cleans a URL path: resolves `.` and `..` segments and clamps
/// the result to the root, so `/../etc/passwd` cleans to `/etc/passwd`
/// inside the document root rather than escaping it.
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut clean = String::from("/");
    clean.push_str(&segments.join("/"));
    clean
}

fn content_type_for(path: &Path) -> HeaderValue {
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    };
    HeaderValue::from_static(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn docroot(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_normalize_clamps_traversal() {
        assert_eq!(normalize("/../../etc/passwd"), "/etc/passwd");
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/a/./b"), "/a/b");
        assert_eq!(normalize("/"), "/");
    }

    #[tokio::test]
    async fn test_serves_file_with_content_type() {
        let root = docroot(&[("page.html", "<html></html>")]);
        let statics = StaticFiles::new(root.path());
        let response = statics.serve("/page.html").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/html");
    }

    #[tokio::test]
    async fn test_directory_serves_index() {
        let root = docroot(&[("index.html", "<html>home</html>")]);
        let statics = StaticFiles::new(root.path());
        let response = statics.serve("/").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/html");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let root = docroot(&[]);
        let statics = StaticFiles::new(root.path());
        let err = statics.serve("/absent.html").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dot_path_is_denied() {
        let root = docroot(&[(".secret", "keys")]);
        let statics = StaticFiles::new(root.path());
        let err = statics.serve("/.secret").await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_nested_dot_directory_is_denied() {
        let root = docroot(&[]);
        let statics = StaticFiles::new(root.path());
        let err = statics.serve("/assets/.git/config").await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_traversal_stays_inside_docroot() {
        let root = docroot(&[("safe.txt", "fine")]);
        let statics = StaticFiles::new(root.path());
        // cleans to /safe.txt inside the docroot
        let response = statics.serve("/../safe.txt").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_extension_is_octet_stream() {
        let root = docroot(&[("blob.bin", "data")]);
        let statics = StaticFiles::new(root.path());
        let response = statics.serve("/blob.bin").await.unwrap();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
    }
}
