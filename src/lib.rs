pub mod acceptor;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod handler;
pub mod headers;
pub mod http;
pub mod logging;
pub mod multipart;
pub mod response;
pub mod router;
pub mod session;
pub mod site;
pub mod static_files;
pub mod worker;

/// Re-exports of common components for easier access
pub use acceptor::ConnectionAcceptor;
pub use config::{Rewrite, ServerConfig, SessionConfig, SiteRoot};
pub use connection::{Connection, ConnectionState};
pub use context::Context;
pub use error::{ServerError, ServerResult};
pub use handler::{Handler, HandlerError, HandlerOutcome, HandlerResult};
pub use headers::{HeaderAccumulator, SetCookie};
pub use http::{decode, frame_length, Frame, Request, Status, UploadedFile};
pub use response::ResponseEncoder;
pub use router::{Outcome, Router};
pub use session::{Session, SessionStore};
pub use site::SiteMap;
pub use static_files::{MimeTypes, StaticFile};
pub use worker::{Exchange, Worker};
