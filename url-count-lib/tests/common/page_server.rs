//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed body per path with `200 OK`; unknown paths get `404`.
//! A page may carry a delay applied after the request is read, to exercise
//! client timeouts. Every response closes the connection.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Page {
    body: String,
    delay: Duration,
}

/// Starts a server in a background thread serving `pages` (path -> body).
/// Returns the base URL without trailing slash (e.g. "http://127.0.0.1:12345").
/// The server runs until the process exits.
pub fn start(pages: &[(&str, &str)]) -> String {
    let pages: Vec<(&str, &str, Duration)> = pages
        .iter()
        .map(|(path, body)| (*path, *body, Duration::ZERO))
        .collect();
    start_with_delays(&pages)
}

/// Like [`start`], but each page waits for its delay before responding.
pub fn start_with_delays(pages: &[(&str, &str, Duration)]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let pages: Arc<HashMap<String, Page>> = Arc::new(
        pages
            .iter()
            .map(|(path, body, delay)| {
                (
                    path.to_string(),
                    Page {
                        body: body.to_string(),
                        delay: *delay,
                    },
                )
            })
            .collect(),
    );
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let pages = Arc::clone(&pages);
            thread::spawn(move || handle(stream, &pages));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: std::net::TcpStream, pages: &HashMap<String, Page>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let response = match pages.get(path) {
        Some(page) => {
            if !page.delay.is_zero() {
                thread::sleep(page.delay);
            }
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                page.body.len(),
                page.body
            )
        }
        None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_string(),
    };
    let _ = stream.write_all(response.as_bytes());
}
