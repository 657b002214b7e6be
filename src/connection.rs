use crate::buffer::Buffer;
use crate::error::{ServerError, ServerResult};
use crate::http::{frame_length, Frame};
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

/// Where a connection is in the request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Decoding,
    Routing,
    Handling,
    StaticServing,
    Encoding,
    Closed,
}

/// Represents a TCP connection with a client
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: usize,
    state: ConnectionState,
    buffer: Buffer,
}

impl Connection {
    /// Create a new connection from a TcpStream
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        id: usize,
        buffer_size: usize,
        timeout: Duration,
    ) -> io::Result<Self> {
        // Set TCP_NODELAY to disable Nagle's algorithm
        stream.set_nodelay(true)?;
        let timeout = if timeout.is_zero() { None } else { Some(timeout) };
        stream.set_read_timeout(timeout)?;

        Ok(Self {
            stream,
            peer_addr,
            id,
            state: ConnectionState::Idle,
            buffer: Buffer::new(buffer_size),
        })
    }

    /// Read until the buffered input starts with a whole request.
    ///
    /// Returns the length of that request, or `None` once the peer has
    /// closed the connection.
    pub fn read_request(
        &mut self,
        max_header_size: usize,
        max_request_size: usize,
    ) -> ServerResult<Option<usize>> {
        loop {
            match frame_length(self.buffer.slice(), max_header_size, max_request_size) {
                Frame::Complete(len) => return Ok(Some(len)),
                Frame::Invalid => {
                    return Err(ServerError::Connection(format!(
                        "unacceptable request from {}",
                        self.peer_addr
                    )))
                }
                Frame::Incomplete => {
                    if self.buffer.read_from(&mut self.stream)? == 0 {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// The first `len` bytes of buffered input
    pub fn request_bytes(&self, len: usize) -> &[u8] {
        &self.buffer.slice()[..len]
    }

    /// Drop a served request from the input
    pub fn consume(&mut self, len: usize) -> ServerResult<()> {
        self.buffer.consume(len)
    }

    /// Write a whole response
    pub fn write_response(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()
    }

    /// Close the connection
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
        // The peer may already be gone
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    /// Get the connection's peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the connection's unique ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get the current state of the connection
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut ConnectionState {
        &mut self.state
    }
}
