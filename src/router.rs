use crate::config::{Rewrite, ServerConfig};
use crate::context::Context;
use crate::error::{ServerError, ServerResult};
use crate::handler::{Handler, HandlerOutcome};
use crate::http::{Request, Status};
use crate::site::SiteMap;
use crate::static_files::{MimeTypes, StaticFile};
use log::{debug, error, info, warn};
use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

pub const BAD_REQUEST_BODY: &[u8] = b"<h1>400 Bad Request</h1>";

pub const NOT_FOUND_BODY: &[u8] =
    b"<html><head><title>404 Not Found</title></head><body><center><h3>404 Not Found</h3></center></body></html>";

/// Where a request ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    BadRequest,
    /// Run the handler for a script inside the site root
    RunHandler {
        script: PathBuf,
        /// The requested path, when a rewrite picked the script
        path_info: Option<String>,
    },
    /// Send a file from the site root
    ServeStatic {
        path: PathBuf,
        mime: String,
        last_modified: Option<String>,
    },
    NotModified,
    NotFound,
}

/// Decides between handler and static file and carries the decision out
pub struct Router {
    sites: SiteMap,
    index_file: String,
    rewrite: Rewrite,
    handler_extensions: Vec<String>,
    mime: MimeTypes,
    change_dir: bool,
    handler: Box<dyn Handler>,
}

// Custom Debug implementation for Router since the handler can't be derived
impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("sites", &self.sites)
            .field("index_file", &self.index_file)
            .field("rewrite", &self.rewrite)
            .field("handler_extensions", &self.handler_extensions)
            .field("change_dir", &self.change_dir)
            .field("handler", &"<handler>")
            .finish()
    }
}

impl Router {
    /// Create a router for the configured sites
    pub fn new<H>(config: &ServerConfig, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        Self {
            sites: SiteMap::from_roots(&config.site_list),
            index_file: config.index_file.clone(),
            rewrite: config.rewrite.clone(),
            handler_extensions: config
                .handler_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            mime: MimeTypes::new(&config.default_mime_type, &config.mime_types),
            change_dir: config.change_dir,
            handler: Box::new(handler),
        }
    }

    pub fn sites(&self) -> &SiteMap {
        &self.sites
    }

    /// Decide what to do with a request
    pub fn route(&self, request: &Request) -> Outcome {
        match self.resolve(request) {
            Ok(outcome) => outcome,
            Err(ServerError::NotFound(path)) => {
                info!("no file for {} requested by {}:{}", path, request.remote_addr, request.remote_port);
                Outcome::NotFound
            }
            Err(err) => {
                warn!(
                    "bad request for {} from {}:{}: {}",
                    request.target, request.remote_addr, request.remote_port, err
                );
                Outcome::BadRequest
            }
        }
    }

    /// Route a request and produce its body, setting status and headers on
    /// the context
    pub fn dispatch(&self, request: &Request, ctx: &mut Context) -> Vec<u8> {
        let outcome = self.route(request);
        self.apply(outcome, request, ctx)
    }

    /// Carry out a routing decision
    pub fn apply(&self, outcome: Outcome, request: &Request, ctx: &mut Context) -> Vec<u8> {
        match outcome {
            Outcome::BadRequest => {
                ctx.status(Status::BadRequest);
                BAD_REQUEST_BODY.to_vec()
            }
            Outcome::NotFound => {
                ctx.status(Status::NotFound);
                NOT_FOUND_BODY.to_vec()
            }
            Outcome::NotModified => {
                ctx.status(Status::NotModified);
                Vec::new()
            }
            Outcome::ServeStatic {
                path,
                mime,
                last_modified,
            } => match fs::read(&path) {
                Ok(body) => {
                    ctx.headers_mut().set_header("Content-Type", &mime);
                    if let Some(modified) = last_modified {
                        ctx.headers_mut().set_header("Last-Modified", &modified);
                    }
                    body
                }
                Err(err) => {
                    error!("failed to read {}: {}", path.display(), err);
                    ctx.status(Status::NotFound);
                    NOT_FOUND_BODY.to_vec()
                }
            },
            Outcome::RunHandler { script, path_info } => {
                self.run_handler(request, &script, path_info, ctx)
            }
        }
    }

    fn resolve(&self, request: &Request) -> ServerResult<Outcome> {
        if !request.path.starts_with('/') {
            return Err(ServerError::Decode(format!(
                "request path {:?} is not absolute",
                request.path
            )));
        }

        // Extension-less paths go to the directory's index script
        let mut path = request.path.clone();
        let mut dynamic = match extension_of(&path) {
            Some(ext) => self.is_dynamic(ext),
            None => {
                if !path.ends_with('/') {
                    path.push('/');
                }
                path.push_str(&self.index_file);
                true
            }
        };

        let root = self
            .sites
            .resolve(&request.server_name)
            .ok_or_else(|| ServerError::Config("no site configured".to_string()))?;

        let mut candidate = root.join(path.trim_start_matches('/'));
        let mut path_info = None;

        if !candidate.is_file() {
            let target = match &self.rewrite {
                Rewrite::Off => return Err(ServerError::NotFound(request.path.clone())),
                Rewrite::Index => self.index_file.as_str(),
                Rewrite::Path(target) => target.as_str(),
            };
            candidate = root.join(target.trim_start_matches('/'));
            if !candidate.is_file() {
                return Err(ServerError::NotFound(request.path.clone()));
            }
            debug!("rewrite {} to {}", request.path, candidate.display());
            dynamic = true;
            path_info = Some(request.path.clone());
        }

        let real = contain(root, &candidate)?;

        if dynamic {
            return Ok(Outcome::RunHandler {
                script: real,
                path_info,
            });
        }

        let file = StaticFile::probe(&real)
            .map_err(|_| ServerError::NotFound(request.path.clone()))?;
        if file.is_fresh(request.if_modified_since()) {
            return Ok(Outcome::NotModified);
        }

        Ok(Outcome::ServeStatic {
            mime: self.mime.for_path(&real).to_string(),
            path: real,
            last_modified: file.last_modified,
        })
    }

    fn is_dynamic(&self, ext: &str) -> bool {
        self.handler_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }

    fn run_handler(
        &self,
        request: &Request,
        script: &Path,
        path_info: Option<String>,
        ctx: &mut Context,
    ) -> Vec<u8> {
        info!(
            "handle request {} from {}:{} with {}",
            request.target,
            request.remote_addr,
            request.remote_port,
            script.display()
        );
        ctx.set_path_info(path_info);

        let _cwd = if self.change_dir {
            self.sites
                .resolve(&request.server_name)
                .and_then(|root| match WorkingDirGuard::enter(root) {
                    Ok(guard) => Some(guard),
                    Err(err) => {
                        error!("failed to enter {}: {}", root.display(), err);
                        None
                    }
                })
        } else {
            None
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.handler.handle(request, script, ctx)
        }));

        let body = match result {
            Ok(Ok(HandlerOutcome::Complete(body))) => body,
            Ok(Ok(HandlerOutcome::Stopped(body))) => {
                debug!("handler for {} stopped early", script.display());
                body
            }
            Ok(Err(err)) => {
                error!("{} ({})", ServerError::Handler(err.to_string()), script.display());
                err.partial_body
            }
            Err(panic) => {
                error!(
                    "{} ({})",
                    ServerError::Handler(panic_message(panic.as_ref())),
                    script.display()
                );
                Vec::new()
            }
        };

        ctx.run_shutdown();
        body
    }
}

/// Make sure a file lies inside the root, following symlinks
fn contain(root: &Path, candidate: &Path) -> ServerResult<PathBuf> {
    let escape = || ServerError::PathEscape(candidate.to_path_buf());
    let real_root = root.canonicalize().map_err(|_| escape())?;
    let real = candidate.canonicalize().map_err(|_| escape())?;

    if real.starts_with(&real_root) {
        Ok(real)
    } else {
        Err(escape())
    }
}

/// Extension of the last path segment, `None` for directories
fn extension_of(path: &str) -> Option<&str> {
    if path.ends_with('/') {
        return None;
    }
    let segment = path.rsplit('/').next().unwrap_or("");
    Path::new(segment)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Switches the working directory and switches back when dropped.
///
/// The working directory is process-wide, so this is only sound with a
/// single worker thread per process.
struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    fn enter(dir: &Path) -> io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.previous) {
            error!(
                "failed to restore working directory {}: {}",
                self.previous.display(),
                err
            );
        }
    }
}
