//! One worker: a single thread serving one connection, and one request on
//! it, at a time.

use crate::acceptor::ConnectionAcceptor;
use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionState};
use crate::context::Context;
use crate::error::{ServerError, ServerResult};
use crate::handler::Handler;
use crate::http::{self, Status};
use crate::response::ResponseEncoder;
use crate::router::{Outcome, Router, BAD_REQUEST_BODY};
use crate::session::SessionStore;
use bytes::Bytes;
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

/// The encoded response to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub response: Bytes,
    /// Whether the connection may carry another request
    pub keep_alive: bool,
}

pub struct Worker {
    id: usize,
    router: Router,
    encoder: ResponseEncoder,
    context: Context,
    keep_alive: bool,
    max_header_size: usize,
    max_request_size: usize,
    buffer_size: usize,
    timeout: Duration,
}

impl Worker {
    pub fn new<H>(id: usize, config: &ServerConfig, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        Self {
            id,
            router: Router::new(config, handler),
            encoder: ResponseEncoder::from_config(config),
            context: Context::new(SessionStore::new(config.session.clone())),
            keep_alive: config.keep_alive,
            max_header_size: config.max_header_size,
            max_request_size: config.max_request_size,
            buffer_size: config.initial_buffer_size,
            timeout: config.connection_timeout,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Decode, route and encode one complete request
    pub fn handle_request(&mut self, raw: &[u8], peer: SocketAddr) -> Exchange {
        let mut state = ConnectionState::Idle;
        self.process(raw, peer, &mut state)
    }

    fn process(&mut self, raw: &[u8], peer: SocketAddr, state: &mut ConnectionState) -> Exchange {
        *state = ConnectionState::Decoding;
        self.context.reset();

        let request = match http::decode(raw, peer) {
            Ok(request) => request,
            Err(err) => {
                warn!("worker {}: {} from {}", self.id, err, peer);
                *state = ConnectionState::Encoding;
                let exchange = self.reject();
                *state = ConnectionState::Idle;
                return exchange;
            }
        };

        info!(
            "receive http request {} {} from {}:{}",
            request.method, request.target, request.remote_addr, request.remote_port
        );

        *state = ConnectionState::Routing;
        let outcome = self.router.route(&request);

        let mut keep_alive =
            self.keep_alive && request.wants_keep_alive() && outcome != Outcome::BadRequest;

        *state = match outcome {
            Outcome::RunHandler { .. } => ConnectionState::Handling,
            Outcome::ServeStatic { .. } => ConnectionState::StaticServing,
            _ => ConnectionState::Encoding,
        };
        let body = self.router.apply(outcome, &request, &mut self.context);

        *state = ConnectionState::Encoding;
        let headers = self.context.headers_mut();
        // A handler asking to close wins
        let handler_closes = headers
            .get("Connection")
            .map_or(false, |value| value.eq_ignore_ascii_case("close"));
        if handler_closes {
            keep_alive = false;
        } else {
            headers.set_header("Connection", if keep_alive { "keep-alive" } else { "close" });
        }
        let response = self.encoder.encode(&body, &mut self.context);

        *state = ConnectionState::Idle;
        Exchange {
            response,
            keep_alive,
        }
    }

    /// A 400 response for input that never became a request
    fn reject(&mut self) -> Exchange {
        self.context.reset();
        self.context.status(Status::BadRequest);
        self.context.headers_mut().set_header("Connection", "close");

        Exchange {
            response: self.encoder.encode(BAD_REQUEST_BODY, &mut self.context),
            keep_alive: false,
        }
    }

    /// Serve requests from a connection until it closes or stops keep-alive
    pub fn serve_connection(&mut self, conn: &mut Connection) -> ServerResult<()> {
        debug!("worker {}: connection {} from {}", self.id, conn.id(), conn.peer_addr());

        let result = self.serve_requests(conn);
        conn.close();
        result
    }

    fn serve_requests(&mut self, conn: &mut Connection) -> ServerResult<()> {
        loop {
            let len = match conn.read_request(self.max_header_size, self.max_request_size) {
                Ok(Some(len)) => len,
                Ok(None) => return Ok(()),
                Err(ServerError::Connection(msg)) => {
                    warn!("worker {}: {}", self.id, msg);
                    let exchange = self.reject();
                    conn.write_response(&exchange.response)?;
                    return Ok(());
                }
                Err(ServerError::Io(err))
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    debug!("worker {}: connection {} timed out", self.id, conn.id());
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

            let raw = conn.request_bytes(len).to_vec();
            conn.consume(len)?;

            let peer = conn.peer_addr();
            let exchange = self.process(&raw, peer, conn.state_mut());
            conn.write_response(&exchange.response)?;

            if !exchange.keep_alive {
                return Ok(());
            }
        }
    }

    /// Accept and serve connections until accepting fails for good
    pub fn run(&mut self, acceptor: &ConnectionAcceptor) -> ServerResult<()> {
        info!("worker {} started", self.id);

        loop {
            let mut conn = match acceptor.accept(self.buffer_size, self.timeout) {
                Ok(conn) => conn,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::ConnectionAborted
                    ) =>
                {
                    continue
                }
                Err(err) => {
                    error!("worker {}: accept failed: {}", self.id, err);
                    return Err(ServerError::Io(err));
                }
            };

            if let Err(err) = self.serve_connection(&mut conn) {
                warn!(
                    "worker {}: connection {} from {}: {}",
                    self.id,
                    conn.id(),
                    conn.peer_addr(),
                    err
                );
            }
        }
    }
}
