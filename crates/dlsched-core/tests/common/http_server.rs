//! Minimal HTTP/1.1 server for end-to-end tests.
//!
//! Serves one static body at any path except `/missing` (404). HEAD answers
//! with Content-Length and Content-Type; GET honors `Range: bytes=N-` with
//! 206 Partial Content. The first `drop_first_gets` GET connections are
//! closed without a response to simulate a flaky link.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub content_type: String,
    pub drop_first_gets: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            drop_first_gets: 0,
        }
    }
}

/// Request counters, shared with the server thread.
#[derive(Debug, Default)]
pub struct Hits {
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
}

/// Starts a server in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345/") and the request counters.
pub fn start(body: Vec<u8>) -> (String, Arc<Hits>) {
    start_with_options(body, ServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> (String, Arc<Hits>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let hits = Arc::new(Hits::default());
    let server_hits = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let hits = Arc::clone(&server_hits);
            let opts = opts.clone();
            thread::spawn(move || handle(stream, &body, &opts, &hits));
        }
    });
    (format!("http://127.0.0.1:{}/", port), hits)
}

/// A URL nothing listens on.
pub fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/gone.bin", port)
}

fn handle(mut stream: TcpStream, body: &[u8], opts: &ServerOptions, hits: &Hits) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, range_start) = parse_request(request);
    let total = body.len() as u64;

    if path == "/missing" {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    if method.eq_ignore_ascii_case("HEAD") {
        hits.heads.fetch_add(1, Ordering::SeqCst);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: {}\r\nAccept-Ranges: bytes\r\n\r\n",
            total, opts.content_type
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if method.eq_ignore_ascii_case("GET") {
        let nth = hits.gets.fetch_add(1, Ordering::SeqCst);
        if nth < opts.drop_first_gets {
            return;
        }
        let (status, slice, content_range) = match range_start {
            Some(start) if start < total => (
                "206 Partial Content",
                &body[start as usize..],
                format!("Content-Range: bytes {}-{}/{}\r\n", start, total - 1, total),
            ),
            Some(_) => (
                "416 Range Not Satisfiable",
                &body[0..0],
                format!("Content-Range: bytes */{}\r\n", total),
            ),
            None => ("200 OK", body, String::new()),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: {}\r\n{}\r\n",
            status,
            slice.len(),
            opts.content_type,
            content_range
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(slice);
        return;
    }

    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
}

/// Returns (method, path, start offset of `Range: bytes=N-`).
fn parse_request(request: &str) -> (&str, &str, Option<u64>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = value
                    .trim()
                    .strip_prefix("bytes=")
                    .and_then(|spec| spec.split_once('-'))
                    .and_then(|(start, _)| start.trim().parse::<u64>().ok());
            }
        }
    }
    (method, path, range)
}
