use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::Cursor;
use std::net::SocketAddr;
use tserve::buffer::Buffer;
use tserve::http::{decode, frame_length};
use tserve::{Context, ResponseEncoder, SessionConfig, SessionStore, SetCookie, Status};

fn benchmark_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer");

    group.bench_function("read_consume_small", |b| {
        b.iter(|| {
            let mut buffer = Buffer::new(1024);
            let data = black_box(vec![0; 256]);
            let mut cursor = Cursor::new(&data);

            buffer.read_from(&mut cursor).unwrap();
            assert_eq!(buffer.slice(), &data[..]);
            buffer.consume(data.len()).unwrap();
        })
    });

    group.bench_function("read_consume_large", |b| {
        b.iter(|| {
            let mut buffer = Buffer::new(8192);
            let data = black_box(vec![0; 4096]);
            let mut cursor = Cursor::new(&data);

            buffer.read_from(&mut cursor).unwrap();
            assert_eq!(buffer.slice(), &data[..]);
            buffer.consume(data.len()).unwrap();
        })
    });

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

    let simple_request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

    group.bench_function("simple_request", |b| {
        b.iter(|| {
            let request = decode(black_box(simple_request), peer).unwrap();
            assert_eq!(request.path, "/");
        })
    });

    let complex_request = b"POST /api/users?page=2&sort=name HTTP/1.1\r\n\
        Host: example.com\r\n\
        User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36\r\n\
        Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n\
        Accept-Language: en-US,en;q=0.5\r\n\
        Cookie: TSESSION=abcdefghij0123456789; theme=dark\r\n\
        Content-Type: application/x-www-form-urlencoded\r\n\
        Content-Length: 39\r\n\
        Connection: keep-alive\r\n\
        \r\n\
        name=John+Doe&email=john%40example.com&";

    group.bench_function("complex_request", |b| {
        b.iter(|| {
            let request = decode(black_box(complex_request), peer).unwrap();
            assert_eq!(request.post_field("name"), Some("John Doe"));
        })
    });

    group.bench_function("frame_length", |b| {
        b.iter(|| frame_length(black_box(complex_request), 16 * 1024, 1024 * 1024))
    });

    group.finish();
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let encoder = ResponseEncoder::new(Some("tserve/bench".to_string()));
    let mut ctx = Context::new(SessionStore::new(SessionConfig::default()));

    let small_body = b"<h1>Hello</h1>".to_vec();
    group.bench_function("small_response", |b| {
        b.iter(|| {
            ctx.status(Status::Ok);
            ctx.set_cookie(&SetCookie::new("theme", "dark").path("/"));
            black_box(encoder.encode(&small_body, &mut ctx))
        })
    });

    let large_body = vec![b'x'; 100_000];
    group.bench_function("large_response", |b| {
        b.iter(|| {
            ctx.header("Content-Type: application/octet-stream");
            black_box(encoder.encode(&large_body, &mut ctx))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_buffer,
    benchmark_decode,
    benchmark_encode,
);
criterion_main!(benches);
