use std::net::SocketAddr;
use tserve::http::{decode, frame_length, Frame, Request, Status};
use tserve::ServerError;

fn peer() -> SocketAddr {
    "10.0.0.7:51234".parse().unwrap()
}

#[test]
fn test_decode_simple_get() {
    let raw = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let request = decode(raw, peer()).unwrap();

    assert_eq!(request.method, "GET");
    assert_eq!(request.target, "/index.html");
    assert_eq!(request.path, "/index.html");
    assert_eq!(request.query_string, "");
    assert_eq!(request.version, "HTTP/1.1");
    assert_eq!(request.header("Host"), "example.com");
    assert_eq!(request.server_name, "example.com");
    assert_eq!(request.server_port, None);
    assert_eq!(request.remote_addr.to_string(), "10.0.0.7");
    assert_eq!(request.remote_port, 51234);
    assert!(request.body.is_empty());
}

#[test]
fn test_decode_headers() {
    let raw = b"GET / HTTP/1.1\r\n\
        Host: example.com:8080\r\n\
        User-Agent: test-agent/1.0\r\n\
        Referer: http://example.com/from\r\n\
        X-Custom: first\r\n\
        x-custom: second\r\n\
        If-Modified-Since: Sun, 06 Nov 1994 08:49:37 GMT\r\n\r\n";
    let request = decode(raw, peer()).unwrap();

    assert_eq!(request.server_name, "example.com");
    assert_eq!(request.server_port, Some(8080));
    assert_eq!(request.user_agent(), "test-agent/1.0");
    assert_eq!(request.referer(), "http://example.com/from");
    assert_eq!(request.header("X-CUSTOM"), "second");
    assert_eq!(request.if_modified_since(), "Sun, 06 Nov 1994 08:49:37 GMT");
    assert_eq!(request.header("Missing"), "");
    assert_eq!(request.raw_headers.len(), 6);
}

#[test]
fn test_decode_cookies() {
    let raw = b"GET / HTTP/1.1\r\nCookie: TSESSION=abc123; theme=dark%20blue;  lang=en\r\n\r\n";
    let request = decode(raw, peer()).unwrap();

    assert_eq!(request.cookie("TSESSION"), Some("abc123"));
    assert_eq!(request.cookie("theme"), Some("dark blue"));
    assert_eq!(request.cookie("lang"), Some("en"));
    assert_eq!(request.cookie("missing"), None);
}

#[test]
fn test_decode_query_parameters() {
    let raw = b"GET /search?q=rust+lang&tag=a&tag=b&empty= HTTP/1.1\r\nHost: x\r\n\r\n";
    let request = decode(raw, peer()).unwrap();

    assert_eq!(request.path, "/search");
    assert_eq!(request.query_string, "q=rust+lang&tag=a&tag=b&empty=");
    assert_eq!(request.query_param("q"), Some("rust lang"));
    assert_eq!(request.query_param("tag"), Some("b"));
    assert_eq!(request.query_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(request.query_param("empty"), Some(""));
    assert_eq!(request.query_param("none"), None);
}

#[test]
fn test_decode_form_post() {
    let raw = b"POST /submit HTTP/1.1\r\n\
        Host: example.com\r\n\
        Content-Type: application/x-www-form-urlencoded\r\n\
        Content-Length: 23\r\n\r\n\
        name=J%C3%B6rg&age=41&x";
    let request = decode(raw, peer()).unwrap();

    assert_eq!(request.body, b"name=J%C3%B6rg&age=41&x");
    assert_eq!(request.post_field("name"), Some("Jörg"));
    assert_eq!(request.post_field("age"), Some("41"));
    assert_eq!(request.post_field("x"), Some(""));
}

#[test]
fn test_decode_json_post_keeps_body_only() {
    let raw = b"POST /api HTTP/1.1\r\n\
        Content-Type: application/json\r\n\
        Content-Length: 15\r\n\r\n\
        {\"name\":\"test\"}";
    let request = decode(raw, peer()).unwrap();

    assert_eq!(request.body, b"{\"name\":\"test\"}");
    assert!(request.post_fields.is_empty());
}

#[test]
fn test_decode_multipart_post() {
    let body = b"--XyZ\r\n\
        Content-Disposition: form-data; name=\"title\"\r\n\r\n\
        holiday\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"photo\"; filename=\"beach.png\"\r\n\
        Content-Type: image/png\r\n\r\n\
        \x89PNG\x00\x01\r\n\
        --XyZ--\r\n";
    let mut raw = format!(
        "POST /upload HTTP/1.1\r\nHost: x\r\nContent-Type: multipart/form-data; boundary=XyZ\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    raw.extend_from_slice(body);

    let request = decode(&raw, peer()).unwrap();

    assert_eq!(request.post_field("title"), Some("holiday"));
    assert_eq!(request.files.len(), 1);
    let file = &request.files[0];
    assert_eq!(file.field, "photo");
    assert_eq!(file.file_name, "beach.png");
    assert_eq!(file.content_type, "image/png");
    assert_eq!(file.data, b"\x89PNG\x00\x01");
}

#[test]
fn test_decode_binary_body_truncated_to_content_length() {
    let mut raw = b"PUT /blob HTTP/1.1\r\nContent-Length: 4\r\n\r\n".to_vec();
    raw.extend_from_slice(&[0, 255, 0, 13, 99, 99]);

    let request = decode(&raw, peer()).unwrap();
    assert_eq!(request.body, vec![0, 255, 0, 13]);
}

#[test]
fn test_decode_malformed_request_line() {
    for raw in [
        &b"GARBAGE\r\n\r\n"[..],
        &b"GET /\r\n\r\n"[..],
        &b"GET / HTTP/1.1 extra\r\n\r\n"[..],
        &b"\r\n\r\n"[..],
    ] {
        match decode(raw, peer()) {
            Err(ServerError::Decode(_)) => {}
            other => panic!("expected a decode error, got {:?}", other),
        }
    }
}

#[test]
fn test_decode_absolute_form_target() {
    let raw = b"GET http://example.com/a/b.css?v=3 HTTP/1.1\r\n\r\n";
    let request = decode(raw, peer()).unwrap();

    assert_eq!(request.path, "/a/b.css");
    assert_eq!(request.query_param("v"), Some("3"));
}

#[test]
fn test_keep_alive_rules() {
    let request = Request::new("GET", "/");
    assert!(request.wants_keep_alive());

    let mut request = Request::new("GET", "/");
    request.set_header("Connection", "close");
    assert!(!request.wants_keep_alive());

    let mut request = Request::new("GET", "/");
    request.version = "HTTP/1.0".to_string();
    assert!(!request.wants_keep_alive());
    request.set_header("Connection", "Keep-Alive");
    assert!(request.wants_keep_alive());
}

#[test]
fn test_frame_length() {
    let get = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
    assert_eq!(frame_length(get, 1024, 4096), Frame::Complete(get.len()));

    assert_eq!(frame_length(b"GET / HTTP/1.1\r\nHost:", 1024, 4096), Frame::Incomplete);

    let post = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel";
    assert_eq!(frame_length(post, 1024, 4096), Frame::Incomplete);

    let post = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloGET / HTTP/1.1\r\n\r\n";
    assert_eq!(frame_length(post, 1024, 4096), Frame::Complete(43));
}

#[test]
fn test_frame_length_with_bare_lf_lines() {
    let raw = b"POST / HTTP/1.1\nHost: x\nContent-Length: 5\r\n\r\nhelloGET / HTTP/1.1\r\n\r\n";

    assert_eq!(frame_length(raw, 1024, 4096), Frame::Complete(50));

    let request = decode(&raw[..50], peer()).unwrap();
    assert_eq!(request.header("content-length"), "5");
    assert_eq!(request.body, b"hello");
}

#[test]
fn test_frame_length_limits() {
    let long_head = vec![b'a'; 2048];
    assert_eq!(frame_length(&long_head, 1024, 4096), Frame::Invalid);

    let big = b"POST / HTTP/1.1\r\nContent-Length: 999999\r\n\r\n";
    assert_eq!(frame_length(big, 1024, 4096), Frame::Invalid);

    let bad = b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
    assert_eq!(frame_length(bad, 1024, 4096), Frame::Invalid);
}

#[test]
fn test_status_lines() {
    assert_eq!(Status::Ok.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(Status::NotModified.status_line(), "HTTP/1.1 304 Not Modified");
    assert_eq!(Status::BadRequest.code(), 400);
    assert_eq!(Status::NotFound.as_str(), "Not Found");
}
