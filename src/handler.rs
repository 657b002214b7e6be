use crate::context::Context;
use crate::http::Request;
use std::fmt;
use std::path::Path;

/// What a handler produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler ran to completion
    Complete(Vec<u8>),
    /// The handler stopped on purpose; the body is whatever it had so far
    Stopped(Vec<u8>),
}

/// A failed handler run, with the output buffered before the failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub message: String,
    /// Where the failure was raised, e.g. `script.php:12`
    pub location: Option<String>,
    pub partial_body: Vec<u8>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            partial_body: Vec::new(),
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_partial_body(mut self, body: Vec<u8>) -> Self {
        self.partial_body = body;
        self
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {}", self.message, location),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for HandlerError {}

pub type HandlerResult = Result<HandlerOutcome, HandlerError>;

/// Produces the body for requests routed to a dynamic script.
///
/// Response headers, cookies and the session are reached through the
/// context. A handler runs on the worker's only thread, so a slow handler
/// holds up every other connection of that worker.
pub trait Handler {
    fn handle(&self, request: &Request, script: &Path, ctx: &mut Context) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Request, &Path, &mut Context) -> HandlerResult,
{
    fn handle(&self, request: &Request, script: &Path, ctx: &mut Context) -> HandlerResult {
        self(request, script, ctx)
    }
}
