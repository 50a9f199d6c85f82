// src/serve/files.rs

//! Mapping of request paths onto the output directory.

use std::path::{Path, PathBuf};

use crate::fs::FileSystem;

/// Where a request path ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File { path: PathBuf, content_type: &'static str },
    /// Directory requested without a trailing slash; relative links inside
    /// its index would break, so the client is sent to `location`.
    Redirect { location: String },
    NotFound,
    /// Path tried to leave the output directory.
    Forbidden,
    BadRequest,
}

/// Resolve `target` (the raw request target, e.g. `/blog/?page=2`) under
/// `root`.
///
/// - query string and fragment are ignored
/// - percent escapes are decoded
/// - `..` segments are rejected
/// - a directory serves its `index.html`
/// - an extension-less path that does not exist falls back to `<path>.html`
pub fn resolve(fs: &dyn FileSystem, root: &Path, target: &str) -> Resolved {
    let path_part = target
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let Some(decoded) = percent_decode(path_part) else {
        return Resolved::BadRequest;
    };

    let mut full = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Resolved::Forbidden,
            s if s.contains('\\') || s.contains('\0') => return Resolved::Forbidden,
            s => full.push(s),
        }
    }

    if fs.is_dir(&full) {
        if !decoded.ends_with('/') {
            return Resolved::Redirect {
                location: format!("{path_part}/"),
            };
        }
        let index = full.join("index.html");
        return if fs.is_file(&index) {
            Resolved::File {
                content_type: content_type_for(&index),
                path: index,
            }
        } else {
            Resolved::NotFound
        };
    }

    if fs.is_file(&full) {
        return Resolved::File {
            content_type: content_type_for(&full),
            path: full,
        };
    }

    if full.extension().is_none() && full != root {
        let html = full.with_extension("html");
        if fs.is_file(&html) {
            return Resolved::File {
                content_type: content_type_for(&html),
                path: html,
            };
        }
    }

    Resolved::NotFound
}

/// Decode `%XX` escapes. Returns `None` for malformed escapes or when the
/// result is not UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

/// Content-Type for a file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "txt" | "md" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

pub fn is_html(content_type: &str) -> bool {
    content_type.starts_with("text/html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn site() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("_site/index.html", b"<h1>home</h1>".to_vec());
        fs.add_file("_site/about.html", b"about".to_vec());
        fs.add_file("_site/blog/index.html", b"blog".to_vec());
        fs.add_file("_site/assets/site.css", b"body{}".to_vec());
        fs.add_file("_site/my page.html", b"spaces".to_vec());
        fs
    }

    fn file(path: &str) -> Resolved {
        let path = PathBuf::from(path);
        Resolved::File {
            content_type: content_type_for(&path),
            path,
        }
    }

    #[test]
    fn root_serves_index() {
        assert_eq!(resolve(&site(), Path::new("_site"), "/"), file("_site/index.html"));
    }

    #[test]
    fn directory_without_slash_redirects() {
        assert_eq!(
            resolve(&site(), Path::new("_site"), "/blog?x=1"),
            Resolved::Redirect {
                location: "/blog/".into()
            }
        );
        assert_eq!(
            resolve(&site(), Path::new("_site"), "/blog/"),
            file("_site/blog/index.html")
        );
    }

    #[test]
    fn extensionless_falls_back_to_html() {
        assert_eq!(resolve(&site(), Path::new("_site"), "/about"), file("_site/about.html"));
    }

    #[test]
    fn escapes_are_decoded() {
        assert_eq!(
            resolve(&site(), Path::new("_site"), "/my%20page.html"),
            file("_site/my page.html")
        );
        assert_eq!(resolve(&site(), Path::new("_site"), "/%zz"), Resolved::BadRequest);
    }

    #[test]
    fn traversal_is_forbidden() {
        assert_eq!(resolve(&site(), Path::new("_site"), "/../secret"), Resolved::Forbidden);
        assert_eq!(resolve(&site(), Path::new("_site"), "/%2e%2e/secret"), Resolved::Forbidden);
    }

    #[test]
    fn missing_is_not_found() {
        assert_eq!(resolve(&site(), Path::new("_site"), "/nope.png"), Resolved::NotFound);
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for(Path::new("a/site.CSS")), "text/css; charset=utf-8");
        assert_eq!(content_type_for(Path::new("a/blob")), "application/octet-stream");
        assert!(is_html(content_type_for(Path::new("x.htm"))));
    }
}
