use crate::config::ServerConfig;
use crate::context::Context;
use crate::headers::header_name;
use bytes::{BufMut, Bytes, BytesMut};
use log::error;

pub const DEFAULT_STATUS_LINE: &str = "HTTP/1.1 200 OK";

pub const DEFAULT_CONTENT_TYPE: &str = "Content-Type: text/html;charset=utf-8";

/// Turns the accumulated headers and a body into response bytes
#[derive(Debug, Clone)]
pub struct ResponseEncoder {
    /// `Server` header value, `None` to leave the header out
    signature: Option<String>,
}

impl ResponseEncoder {
    pub fn new(signature: Option<String>) -> Self {
        Self { signature }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        if config.expose_server {
            Self::new(Some(config.server_signature.clone()))
        } else {
            Self::new(None)
        }
    }

    /// Encode a response and get the context ready for the next request.
    ///
    /// The session is flushed before the bytes are handed out. A failed
    /// flush is logged and the response goes out regardless.
    pub fn encode(&self, body: &[u8], ctx: &mut Context) -> Bytes {
        let headers = ctx.headers();
        let mut out = BytesMut::with_capacity(256 + body.len());

        put_line(&mut out, headers.status_line().unwrap_or(DEFAULT_STATUS_LINE));

        if !headers.contains("Content-Type") {
            put_line(&mut out, DEFAULT_CONTENT_TYPE);
        }

        // Content-Length always describes the body given here
        for line in headers.lines() {
            let name = header_name(line);
            if name.eq_ignore_ascii_case("content-length")
                || (self.signature.is_some() && name.eq_ignore_ascii_case("server"))
            {
                continue;
            }
            put_line(&mut out, line);
        }

        if let Some(signature) = &self.signature {
            put_line(&mut out, &format!("Server: {}", signature));
        }

        put_line(&mut out, &format!("Content-Length: {}", body.len()));

        if let Err(err) = ctx.session_write_close() {
            error!("{}", err);
        }

        out.put_slice(b"\r\n");
        out.put_slice(body);

        ctx.headers_mut().clear();
        out.freeze()
    }
}

fn put_line(out: &mut BytesMut, line: &str) {
    out.put_slice(line.as_bytes());
    out.put_slice(b"\r\n");
}
