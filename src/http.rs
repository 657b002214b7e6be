use crate::error::{ServerError, ServerResult};
use crate::multipart;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// HTTP Status Codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 200,
    Created = 201,
    NoContent = 204,

    MovedPermanently = 301,
    Found = 302,
    NotModified = 304,

    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,

    InternalServerError = 500,
}

impl Status {
    /// Get the text description for this status code
    pub fn as_str(&self) -> &'static str {
        match *self {
            Status::Ok => "OK",
            Status::Created => "Created",
            Status::NoContent => "No Content",

            Status::MovedPermanently => "Moved Permanently",
            Status::Found => "Found",
            Status::NotModified => "Not Modified",

            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",

            Status::InternalServerError => "Internal Server Error",
        }
    }

    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// The full status line without the trailing CRLF, e.g. `HTTP/1.1 404 Not Found`
    pub fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}", self.code(), self.as_str())
    }
}

/// A file received in a `multipart/form-data` body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Name of the form field
    pub field: String,
    /// File name as sent by the client
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// HTTP Request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// The request target exactly as sent
    pub target: String,
    pub path: String,
    pub query_string: String,
    pub version: String,
    /// Query parameters in the order they were sent
    pub query: Vec<(String, String)>,
    /// Lower-cased header names, last value wins
    pub headers: HashMap<String, String>,
    /// Every header line as received
    pub raw_headers: Vec<String>,
    pub cookies: HashMap<String, String>,
    pub body: Vec<u8>,
    pub post_fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
    pub remote_addr: IpAddr,
    pub remote_port: u16,
    /// Host name part of the `Host` header
    pub server_name: String,
    pub server_port: Option<u16>,
}

impl Request {
    /// Create a new request for the given method and target
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query_string) = split_target(target);
        let query = parse_form(query_string.as_bytes());

        Self {
            method: method.to_string(),
            target: target.to_string(),
            path,
            query_string,
            version: "HTTP/1.1".to_string(),
            query,
            headers: HashMap::new(),
            raw_headers: Vec::new(),
            cookies: HashMap::new(),
            body: Vec::new(),
            post_fields: HashMap::new(),
            files: Vec::new(),
            remote_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            remote_port: 0,
            server_name: String::new(),
            server_port: None,
        }
    }

    /// Record a raw `Key: Value` header line
    pub fn add_header_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        self.raw_headers.push(line.to_string());

        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key.trim().to_ascii_lowercase(), value.trim()),
            None => return,
        };

        match key.as_str() {
            "host" => {
                let (name, port) = split_host(value);
                self.server_name = name;
                self.server_port = port;
            }
            "cookie" => parse_cookies(value, &mut self.cookies),
            _ => {}
        }

        self.headers.insert(key, value.to_string());
    }

    /// Set a header as if it had been received
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.add_header_line(&format!("{}: {}", name, value));
    }

    /// Get a header, or an empty string when it was not sent
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn content_type(&self) -> &str {
        self.header("content-type")
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent")
    }

    pub fn referer(&self) -> &str {
        self.header("referer")
    }

    pub fn if_modified_since(&self) -> &str {
        self.header("if-modified-since")
    }

    pub fn if_none_match(&self) -> &str {
        self.header("if-none-match")
    }

    /// The last value sent for a query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value sent for a query parameter, in order
    pub fn query_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn post_field(&self, name: &str) -> Option<&str> {
        self.post_fields.get(name).map(String::as_str)
    }

    /// Whether the client asked to keep the connection open
    pub fn wants_keep_alive(&self) -> bool {
        let connection = self.header("connection").to_ascii_lowercase();
        if self.version.eq_ignore_ascii_case("HTTP/1.0") {
            connection.contains("keep-alive")
        } else {
            !connection.contains("close")
        }
    }
}

/// Decode one complete request.
///
/// The only failure is a request line that does not consist of exactly
/// method, target and version. Everything else degrades to empty values.
pub fn decode(raw: &[u8], peer: SocketAddr) -> ServerResult<Request> {
    let (head, body) = match find_bytes(raw, b"\r\n\r\n") {
        Some(pos) => (&raw[..pos], &raw[pos + 4..]),
        None => (raw, &raw[raw.len()..]),
    };

    let head = String::from_utf8_lossy(head);
    let mut lines = header_lines(&head);

    let request_line = lines.next().unwrap_or("");
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(ServerError::Decode(format!(
            "invalid request line {:?}",
            request_line
        )));
    }

    let mut request = Request::new(parts[0], parts[1]);
    request.version = parts[2].to_string();
    request.remote_addr = peer.ip();
    request.remote_port = peer.port();

    for line in lines {
        request.add_header_line(line);
    }

    // Only the declared body belongs to this request
    let body = match request.header("content-length").parse::<usize>() {
        Ok(len) => &body[..len.min(body.len())],
        Err(_) => body,
    };
    request.body = body.to_vec();

    if request.method.eq_ignore_ascii_case("POST") {
        let content_type = request.content_type().to_string();
        if let Some(boundary) = multipart::boundary(&content_type) {
            let form = multipart::parse(&request.body, &boundary);
            request.post_fields = form.fields;
            request.files = form.files;
        } else if content_type.is_empty()
            || content_type
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        {
            request.post_fields = parse_form(&request.body).into_iter().collect();
        }
    }

    Ok(request)
}

/// How much of a connection's input makes up the next request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// More bytes are needed
    Incomplete,
    /// The first `n` bytes hold one whole request
    Complete(usize),
    /// The input can never become a valid request
    Invalid,
}

/// Work out whether `buf` starts with a whole request.
pub fn frame_length(buf: &[u8], max_header_size: usize, max_request_size: usize) -> Frame {
    let header_end = match find_bytes(buf, b"\r\n\r\n") {
        Some(pos) => pos + 4,
        None if buf.len() > max_header_size => return Frame::Invalid,
        None => return Frame::Incomplete,
    };
    if header_end > max_header_size {
        return Frame::Invalid;
    }

    let head = String::from_utf8_lossy(&buf[..header_end]);
    let mut content_length = 0usize;
    for line in header_lines(&head).skip(1) {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                match value.trim().parse::<usize>() {
                    Ok(len) => content_length = len,
                    Err(_) => return Frame::Invalid,
                }
            }
        }
    }

    let total = match header_end.checked_add(content_length) {
        Some(total) if total <= max_request_size => total,
        _ => return Frame::Invalid,
    };

    if buf.len() >= total {
        Frame::Complete(total)
    } else {
        Frame::Incomplete
    }
}

/// Lines of a header block, ending in either CRLF or a bare LF
fn header_lines(head: &str) -> impl Iterator<Item = &str> {
    head.split('\n').map(|line| line.trim_end_matches('\r'))
}

/// Position of the first occurrence of `needle` in `haystack`
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Split a request target into path and query string
fn split_target(target: &str) -> (String, String) {
    let target = target.split('#').next().unwrap_or("");

    // Absolute-form: drop scheme and authority
    let target = match target
        .strip_prefix("http://")
        .or_else(|| target.strip_prefix("https://"))
    {
        Some(rest) => rest
            .find(|c| c == '/' || c == '?')
            .map(|pos| &rest[pos..])
            .unwrap_or(""),
        None => target,
    };

    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let path = if path.is_empty() { "/" } else { path };

    (path.to_string(), query.to_string())
}

fn split_host(host: &str) -> (String, Option<u16>) {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some((name, after)) = rest.split_once(']') {
            let port = after.strip_prefix(':').and_then(|port| port.parse().ok());
            return (name.to_string(), port);
        }
    }

    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => (name.to_string(), port.parse().ok()),
        _ => (host.to_string(), None),
    }
}

fn parse_cookies(value: &str, cookies: &mut HashMap<String, String>) {
    for pair in value.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        for (key, value) in form_urlencoded::parse(pair.as_bytes()) {
            if !key.is_empty() {
                cookies.insert(key.into_owned(), value.into_owned());
            }
        }
    }
}

fn parse_form(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input)
        .into_owned()
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
