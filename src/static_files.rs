use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A map of file extensions to content types
fn content_type_map() -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut add = |ext: &str, mime: &str| {
        map.insert(ext.to_string(), mime.to_string());
    };

    // Text types
    add("html", "text/html");
    add("htm", "text/html");
    add("css", "text/css");
    add("js", "application/javascript");
    add("txt", "text/plain");
    add("md", "text/markdown");
    add("csv", "text/csv");

    // Application types
    add("json", "application/json");
    add("xml", "application/xml");
    add("pdf", "application/pdf");
    add("zip", "application/zip");
    add("tar", "application/x-tar");
    add("gz", "application/gzip");
    add("wasm", "application/wasm");

    // Image types
    add("png", "image/png");
    add("jpg", "image/jpeg");
    add("jpeg", "image/jpeg");
    add("gif", "image/gif");
    add("svg", "image/svg+xml");
    add("webp", "image/webp");
    add("ico", "image/x-icon");

    // Audio types
    add("mp3", "audio/mpeg");
    add("wav", "audio/wav");
    add("ogg", "audio/ogg");

    // Video types
    add("mp4", "video/mp4");
    add("webm", "video/webm");

    // Font types
    add("ttf", "font/ttf");
    add("otf", "font/otf");
    add("woff", "font/woff");
    add("woff2", "font/woff2");

    map
}

/// Extension to content type lookup with a fallback type
#[derive(Debug, Clone)]
pub struct MimeTypes {
    types: HashMap<String, String>,
    default_type: String,
}

impl MimeTypes {
    /// The built-in table, extended or overridden by `extra`
    pub fn new(default_type: &str, extra: &HashMap<String, String>) -> Self {
        let mut types = content_type_map();
        for (ext, mime) in extra {
            types.insert(ext.to_ascii_lowercase(), mime.clone());
        }

        Self {
            types,
            default_type: default_type.to_string(),
        }
    }

    /// Get the content type for an extension
    pub fn for_extension(&self, ext: &str) -> &str {
        self.types
            .get(&ext.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(&self.default_type)
    }

    /// Get the content type for a file based on its extension
    pub fn for_path(&self, path: &Path) -> &str {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.for_extension(ext)
    }
}

impl Default for MimeTypes {
    fn default() -> Self {
        Self::new("application/octet-stream", &HashMap::new())
    }
}

/// Format a time as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// A file about to be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub path: PathBuf,
    /// The `Last-Modified` value, if the platform reports mtimes
    pub last_modified: Option<String>,
}

impl StaticFile {
    /// Stat a regular file
    pub fn probe(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            last_modified: metadata.modified().ok().map(http_date),
        })
    }

    /// Whether an `If-Modified-Since` value matches exactly
    pub fn is_fresh(&self, if_modified_since: &str) -> bool {
        match &self.last_modified {
            Some(modified) => !if_modified_since.is_empty() && modified == if_modified_since,
            None => false,
        }
    }
}
