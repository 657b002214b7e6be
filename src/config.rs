use crate::error::{ServerError, ServerResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A virtual host and the directory it is served from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRoot {
    pub host: String,
    pub root: PathBuf,
}

impl SiteRoot {
    pub fn new(host: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            host: host.to_string(),
            root: root.into(),
        }
    }
}

/// What to do when the requested file does not exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rewrite {
    /// Answer with 404
    Off,
    /// Hand the request to the site's index file
    Index,
    /// Hand the request to a fixed script relative to the site root
    Path(String),
}

impl Default for Rewrite {
    fn default() -> Self {
        Rewrite::Off
    }
}

/// Session cookie and storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id
    pub name: String,

    /// Directory holding one file per session
    pub save_path: PathBuf,

    /// Max-Age of the cookie in seconds, 0 for a browser-session cookie
    pub cookie_lifetime: u64,
    pub cookie_path: String,
    pub cookie_domain: String,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "TSESSION".to_string(),
            save_path: env::temp_dir(),
            cookie_lifetime: 0,
            cookie_path: "/".to_string(),
            cookie_domain: String::new(),
            cookie_secure: false,
            cookie_http_only: false,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    // Network configuration
    pub listen_address: String,
    pub port: u16,
    pub backlog_size: i32,

    // Worker configuration
    pub worker_threads: usize,

    // Connection settings
    pub connection_timeout: Duration,
    pub initial_buffer_size: usize,

    // HTTP configuration
    pub max_header_size: usize,
    pub max_request_size: usize,
    pub keep_alive: bool,

    // Site configuration
    pub site_list: Vec<SiteRoot>,
    pub index_file: String,
    pub rewrite: Rewrite,
    /// Extensions that are run through the handler instead of served
    pub handler_extensions: Vec<String>,
    /// Switch into the site root while a handler runs
    pub change_dir: bool,

    // Response configuration
    pub default_mime_type: String,
    /// Extra or overriding extension to content type entries
    pub mime_types: HashMap<String, String>,
    pub expose_server: bool,
    pub server_signature: String,

    pub log_level: String,

    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            port: 8080,
            backlog_size: 1024,

            worker_threads: num_cpus::get(),

            connection_timeout: Duration::from_secs(30),
            initial_buffer_size: 16 * 1024, // 16 KB

            max_header_size: 16 * 1024, // 16 KB
            max_request_size: 10 * 1024 * 1024, // 10 MB
            keep_alive: true,

            site_list: Vec::new(),
            index_file: "index.php".to_string(),
            rewrite: Rewrite::Off,
            handler_extensions: vec!["php".to_string()],
            change_dir: false,

            default_mime_type: "application/octet-stream".to_string(),
            mime_types: HashMap::new(),
            expose_server: true,
            server_signature: concat!("tserve/", env!("CARGO_PKG_VERSION")).to_string(),

            log_level: "info".to_string(),

            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address and port to listen on
    pub fn with_address(mut self, address: &str, port: u16) -> Self {
        self.listen_address = address.to_string();
        self.port = port;
        self
    }

    /// Set the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the number of worker threads
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Add a virtual host. The first site added is the fallback.
    pub fn with_site(mut self, host: &str, root: impl Into<PathBuf>) -> Self {
        self.site_list.push(SiteRoot::new(host, root));
        self
    }

    pub fn with_index_file(mut self, index_file: &str) -> Self {
        self.index_file = index_file.to_string();
        self
    }

    pub fn with_rewrite(mut self, rewrite: Rewrite) -> Self {
        self.rewrite = rewrite;
        self
    }

    /// Set the directory session files are kept in
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session.save_path = path.into();
        self
    }

    /// Get the full address string (address:port)
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }

    /// Check the settings a running server cannot do without
    pub fn validate(&self) -> ServerResult<()> {
        if self.site_list.is_empty() {
            return Err(ServerError::Config(
                "no site configured, add at least one entry to site_list".to_string(),
            ));
        }
        if self.index_file.is_empty() {
            return Err(ServerError::Config("index_file must not be empty".to_string()));
        }
        if self.session.name.is_empty() {
            return Err(ServerError::Config("session cookie name must not be empty".to_string()));
        }
        if self.worker_threads == 0 {
            return Err(ServerError::Config("worker_threads must be at least 1".to_string()));
        }
        // The working directory is shared by every thread of the process
        if self.change_dir && self.worker_threads > 1 {
            return Err(ServerError::Config(
                "change_dir needs worker_threads set to 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ServerResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_json_file<P: AsRef<Path>>(&self, path: P) -> ServerResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
