use serde_json::json;
use std::fs;
use tempfile::TempDir;
use tserve::{
    Context, Request, ResponseEncoder, ServerConfig, SessionConfig, SessionStore, SetCookie, Status,
};

fn context(dir: &TempDir) -> Context {
    Context::new(SessionStore::new(SessionConfig {
        save_path: dir.path().to_path_buf(),
        ..SessionConfig::default()
    }))
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn test_encode_defaults() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(None);

    let response = encoder.encode(b"hello", &mut ctx);

    assert_eq!(
        text(&response),
        "HTTP/1.1 200 OK\r\nContent-Type: text/html;charset=utf-8\r\nContent-Length: 5\r\n\r\nhello"
    );
}

#[test]
fn test_encode_explicit_status_and_headers() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(Some("tserve/test".to_string()));

    ctx.status(Status::NotFound);
    ctx.header("Content-Type: text/plain");
    ctx.header("X-Trace: 1");

    let response = encoder.encode(b"", &mut ctx);

    assert_eq!(
        text(&response),
        "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nX-Trace: 1\r\nServer: tserve/test\r\nContent-Length: 0\r\n\r\n"
    );
}

#[test]
fn test_encode_raw_status_line() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(None);

    ctx.header("HTTP/1.1 418 I'm a teapot");
    let response = text(&encoder.encode(b"", &mut ctx));

    assert!(response.starts_with("HTTP/1.1 418 I'm a teapot\r\n"));
}

#[test]
fn test_encode_multiple_cookies() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(None);

    ctx.set_cookie(&SetCookie::new("a", "1"));
    ctx.set_cookie(&SetCookie::new("b", "two words").path("/").http_only(true));

    let response = text(&encoder.encode(b"x", &mut ctx));

    assert!(response.contains("\r\nSet-Cookie: a=1\r\n"));
    assert!(response.contains("\r\nSet-Cookie: b=two%20words; Path=/; HttpOnly\r\n"));
}

#[test]
fn test_encode_server_header_from_config() {
    let dir = TempDir::new().unwrap();

    let config = ServerConfig::new();
    let response = text(&ResponseEncoder::from_config(&config).encode(b"", &mut context(&dir)));
    assert!(response.contains(&format!("\r\nServer: {}\r\n", config.server_signature)));

    let mut config = ServerConfig::new();
    config.expose_server = false;
    let response = text(&ResponseEncoder::from_config(&config).encode(b"", &mut context(&dir)));
    assert!(!response.contains("Server:"));
}

#[test]
fn test_encode_binary_body() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(None);

    let body = [0u8, 1, 0, 255, b'\r', b'\n', 0];
    ctx.header("Content-Type: application/octet-stream");
    let response = encoder.encode(&body, &mut ctx);

    let head_end = response
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .unwrap();
    assert!(text(&response[..head_end]).contains("Content-Length: 7"));
    assert_eq!(&response[head_end + 4..], &body[..]);
}

#[test]
fn test_encode_clears_headers() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(None);

    ctx.status(Status::BadRequest);
    ctx.header("X-Once: yes");
    let first = encoder.encode(b"a", &mut ctx);
    assert!(ctx.headers().is_empty());

    let second = text(&encoder.encode(b"a", &mut ctx));
    assert!(text(&first).starts_with("HTTP/1.1 400 Bad Request"));
    assert!(second.starts_with("HTTP/1.1 200 OK"));
    assert!(!second.contains("X-Once"));
}

#[test]
fn test_encode_same_input_same_bytes() {
    let dir = TempDir::new().unwrap();
    let encoder = ResponseEncoder::new(Some("s".to_string()));

    let encode = || {
        let mut ctx = context(&dir);
        ctx.header("Content-Type: text/plain");
        ctx.set_cookie(&SetCookie::new("k", "v"));
        encoder.encode(b"same", &mut ctx)
    };

    assert_eq!(encode(), encode());
}

#[test]
fn test_encode_flushes_session() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(None);

    let file = {
        let session = ctx.session_start(&Request::new("GET", "/"));
        session.set("count", 7);
        session.file().to_path_buf()
    };

    let response = text(&encoder.encode(b"", &mut ctx));

    assert!(response.contains("Set-Cookie: TSESSION="));
    assert!(ctx.session().is_none());
    let stored: serde_json::Value = serde_json::from_slice(&fs::read(file).unwrap()).unwrap();
    assert_eq!(stored, json!({ "count": 7 }));
}

#[test]
fn test_encode_ignores_handler_content_length() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(Some("tserve/test".to_string()));

    ctx.header("Content-Length: 999");
    ctx.header("Server: handler/1.0");
    let response = text(&encoder.encode(b"abc", &mut ctx));

    assert_eq!(response.matches("Content-Length:").count(), 1);
    assert!(response.contains("\r\nContent-Length: 3\r\n"));
    assert_eq!(response.matches("Server:").count(), 1);
    assert!(response.contains("\r\nServer: tserve/test\r\n"));
    assert!(response.ends_with("\r\n\r\nabc"));
}

#[test]
fn test_encode_keeps_handler_server_without_signature() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let encoder = ResponseEncoder::new(None);

    ctx.header("Server: handler/1.0");
    let response = text(&encoder.encode(b"", &mut ctx));

    assert!(response.contains("\r\nServer: handler/1.0\r\n"));
}
