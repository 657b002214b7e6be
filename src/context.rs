//! Per-connection request state.
//!
//! Everything a request may leave behind (pending headers, the started
//! session, deferred callbacks) lives here and is reset before the next
//! request on the same connection is decoded.

use crate::error::ServerResult;
use crate::headers::{HeaderAccumulator, SetCookie};
use crate::http::{Request, Status};
use crate::session::{Session, SessionStore};
use log::{debug, error};
use std::fmt;

type Deferred = Box<dyn FnOnce()>;

pub struct Context {
    headers: HeaderAccumulator,
    store: SessionStore,
    session: Option<Session>,
    path_info: Option<String>,
    deferred: Vec<Deferred>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("headers", &self.headers)
            .field("session", &self.session)
            .field("path_info", &self.path_info)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

impl Context {
    pub fn new(store: SessionStore) -> Self {
        Self {
            headers: HeaderAccumulator::new(),
            store,
            session: None,
            path_info: None,
            deferred: Vec::new(),
        }
    }

    /// Forget everything left over from the previous request
    pub fn reset(&mut self) {
        self.headers.clear();
        self.session = None;
        self.path_info = None;
        self.deferred.clear();
    }

    pub fn headers(&self) -> &HeaderAccumulator {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderAccumulator {
        &mut self.headers
    }

    /// Add a raw response header line
    pub fn header(&mut self, line: &str) {
        self.headers.header(line);
    }

    pub fn status(&mut self, status: Status) {
        self.headers.status(status);
    }

    pub fn set_cookie(&mut self, cookie: &SetCookie) {
        self.headers.set_cookie(cookie);
    }

    /// The originally requested path when a rewrite sent the request to
    /// another script
    pub fn path_info(&self) -> Option<&str> {
        self.path_info.as_deref()
    }

    pub(crate) fn set_path_info(&mut self, path_info: Option<String>) {
        self.path_info = path_info;
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.store
    }

    /// Start the session for this request, or return the one already started
    pub fn session_start(&mut self, request: &Request) -> &mut Session {
        let store = &self.store;
        let headers = &mut self.headers;
        self.session
            .get_or_insert_with(|| store.start(request, headers))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Drop the session data and its file
    pub fn session_destroy(&mut self) -> ServerResult<()> {
        match self.session.as_mut() {
            Some(session) => self.store.destroy(session),
            None => Ok(()),
        }
    }

    /// Give the started session a new id
    pub fn session_regenerate_id(&mut self, delete_old: bool) -> ServerResult<()> {
        match self.session.as_mut() {
            Some(session) => self.store.regenerate_id(session, &mut self.headers, delete_old),
            None => Ok(()),
        }
    }

    /// Persist and close the session, if one was started
    pub fn session_write_close(&mut self) -> ServerResult<()> {
        match self.session.take() {
            Some(session) => {
                debug!("write and close session {}", session.id());
                self.store.write_close(&session)
            }
            None => Ok(()),
        }
    }

    /// Run `callback` once the handler for this request has returned
    pub fn register_shutdown<F>(&mut self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.deferred.push(Box::new(callback));
    }

    /// Run and forget the registered callbacks
    pub fn run_shutdown(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        debug!("run {} shutdown callbacks", self.deferred.len());
        for callback in self.deferred.drain(..) {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback));
            if result.is_err() {
                error!("shutdown callback panicked");
            }
        }
    }
}
