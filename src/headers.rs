use crate::http::Status;
use log::debug;
use std::fmt;

/// Pending response header lines for the request being served.
///
/// Handlers and the router write into it, the encoder drains it. It holds
/// at most one status line; `Set-Cookie` lines accumulate while any other
/// header replaces an earlier line of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderAccumulator {
    status: Option<String>,
    lines: Vec<String>,
}

impl HeaderAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw header line, or a status line if it starts with `HTTP/`
    pub fn header(&mut self, line: &str) {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        debug!("add response header {:?}", line);

        if line.starts_with("HTTP/") {
            self.status = Some(line.to_string());
            return;
        }

        let name = header_name(line);
        if name.eq_ignore_ascii_case("set-cookie") {
            self.lines.push(line.to_string());
            return;
        }

        match self
            .lines
            .iter_mut()
            .find(|existing| header_name(existing).eq_ignore_ascii_case(name))
        {
            Some(existing) => *existing = line.to_string(),
            None => self.lines.push(line.to_string()),
        }
    }

    /// Set a header by name and value
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.header(&format!("{}: {}", name, value));
    }

    /// Set the response status
    pub fn status(&mut self, status: Status) {
        self.status = Some(status.status_line());
    }

    pub fn set_cookie(&mut self, cookie: &SetCookie) {
        self.header(&cookie.to_string());
    }

    /// Remove every line with the given header name
    pub fn remove(&mut self, name: &str) {
        self.lines
            .retain(|line| !header_name(line).eq_ignore_ascii_case(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The value of the first line with the given header name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| header_name(line).eq_ignore_ascii_case(name))
            .map(|line| line.split_once(':').map(|(_, value)| value.trim()).unwrap_or(""))
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Header lines in the order they were first set
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether anything has been set for the current response
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.status = None;
        self.lines.clear();
    }
}

/// The name part of a `Name: value` line
pub(crate) fn header_name(line: &str) -> &str {
    line.split(':').next().unwrap_or("").trim()
}

/// A `Set-Cookie` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// Max-Age in seconds, 0 leaves it out
    pub max_age: u64,
    pub path: String,
    pub domain: String,
    pub secure: bool,
    pub http_only: bool,
}

impl SetCookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            ..Self::default()
        }
    }

    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Set-Cookie: {}=", self.name)?;
        // A literal '+' is already escaped, so every '+' left stands for a space
        for chunk in form_urlencoded::byte_serialize(self.value.as_bytes()) {
            f.write_str(&chunk.replace('+', "%20"))?;
        }

        if !self.domain.is_empty() {
            write!(f, "; Domain={}", self.domain)?;
        }
        if self.max_age > 0 {
            write!(f, "; Max-Age={}", self.max_age)?;
        }
        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}
