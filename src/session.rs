//! File-backed sessions.
//!
//! Every session lives in `<save_path>/tourze_session_<id>` as a JSON object.
//! Workers share nothing but these files and take no locks, so when two
//! workers write the same session the later write wins.

use crate::config::SessionConfig;
use crate::error::{ServerError, ServerResult};
use crate::headers::{HeaderAccumulator, SetCookie};
use crate::http::Request;
use log::{debug, info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Prefix of every session file name
pub const FILE_PREFIX: &str = "tourze_session_";

/// Length of freshly generated session ids
pub const ID_LENGTH: usize = 20;

/// Longest cookie value accepted as a session id
const MAX_ID_LENGTH: usize = 64;

/// The key-value data of one session
pub type SessionData = BTreeMap<String, Value>;

/// A started session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    file: PathBuf,
    data: SessionData,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The file backing this session
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Creates, loads, persists and destroys sessions
#[derive(Debug, Clone)]
pub struct SessionStore {
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session id sent by the client, or an empty string
    pub fn session_id(&self, request: &Request) -> String {
        request.cookie(&self.config.name).unwrap_or("").to_string()
    }

    /// Path of the file for a session id
    pub fn file_for(&self, id: &str) -> PathBuf {
        self.config.save_path.join(format!("{}{}", FILE_PREFIX, id))
    }

    /// Start the session for a request.
    ///
    /// A well-formed id sent by the client is kept even if its file is
    /// gone; anything else gets a new id. The session cookie is always
    /// (re)issued.
    pub fn start(&self, request: &Request, headers: &mut HeaderAccumulator) -> Session {
        let sent = self.session_id(request);
        let id = if is_valid_id(&sent) {
            sent
        } else {
            if !sent.is_empty() {
                warn!("ignoring malformed session id {:?}", sent);
            }
            generate_id()
        };

        let file = self.file_for(&id);
        if let Err(err) = create_if_missing(&file) {
            warn!("failed to create session file {}: {}", file.display(), err);
        }

        headers.set_cookie(&self.cookie(&id));

        let data = match load(&file) {
            Ok(data) => data,
            Err(err) => {
                warn!("{}, starting with an empty session", err);
                SessionData::new()
            }
        };

        debug!("session {} started with {} keys", id, data.len());
        Session { id, file, data }
    }

    /// Persist the session data. Nothing is written for an empty session.
    pub fn write_close(&self, session: &Session) -> ServerResult<()> {
        if session.is_empty() {
            return Ok(());
        }

        let content = serde_json::to_vec(&session.data)?;
        let dir = session
            .file
            .parent()
            .unwrap_or_else(|| Path::new("."));

        let write = || -> io::Result<()> {
            let mut temp = NamedTempFile::new_in(dir)?;
            temp.write_all(&content)?;
            temp.persist(&session.file).map_err(|err| err.error)?;
            Ok(())
        };

        write().map_err(|err| {
            ServerError::SessionWrite(format!("{}: {}", session.file.display(), err))
        })
    }

    /// Clear the session data and delete its file
    pub fn destroy(&self, session: &mut Session) -> ServerResult<()> {
        session.clear();
        info!("destroy session {}", session.id);

        match fs::remove_file(&session.file) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ServerError::SessionWrite(format!(
                "{}: {}",
                session.file.display(),
                err
            ))),
        }
    }

    /// Move the session to a new id, keeping its data
    pub fn regenerate_id(
        &self,
        session: &mut Session,
        headers: &mut HeaderAccumulator,
        delete_old: bool,
    ) -> ServerResult<()> {
        let old_file = session.file.clone();

        session.id = generate_id();
        session.file = self.file_for(&session.id);
        create_if_missing(&session.file)?;
        headers.set_cookie(&self.cookie(&session.id));

        if delete_old {
            if let Err(err) = fs::remove_file(&old_file) {
                if err.kind() != io::ErrorKind::NotFound {
                    return Err(ServerError::SessionWrite(format!(
                        "{}: {}",
                        old_file.display(),
                        err
                    )));
                }
            }
        }
        Ok(())
    }

    fn cookie(&self, id: &str) -> SetCookie {
        SetCookie::new(&self.config.name, id)
            .max_age(self.config.cookie_lifetime)
            .path(&self.config.cookie_path)
            .domain(&self.config.cookie_domain)
            .secure(self.config.cookie_secure)
            .http_only(self.config.cookie_http_only)
    }
}

/// A fresh random session id
pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Only plain alphanumeric ids may name a session file
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LENGTH && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn create_if_missing(file: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .open(file)
        .map(|_| ())
}

fn load(file: &Path) -> ServerResult<SessionData> {
    let content = fs::read(file)
        .map_err(|err| ServerError::SessionRead(format!("{}: {}", file.display(), err)))?;
    if content.is_empty() {
        return Ok(SessionData::new());
    }
    serde_json::from_slice(&content)
        .map_err(|err| ServerError::SessionRead(format!("{}: {}", file.display(), err)))
}
