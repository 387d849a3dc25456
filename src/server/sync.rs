//! Synchronous (WSGI-style) backend.
//!
//! A blocking accept loop over a single `std::net` listening socket. With
//! threading enabled each connection gets its own worker thread; the
//! workers share only the listening socket, which the OS arbitrates. IPv4
//! vs IPv6 is baked into the socket at bind time.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};

use crate::config::ServerOptions;
use crate::logaction::{LogSink, RequestLogEvent};
use crate::server::reason_phrase;
use crate::wsgi::{SyncHandler, SyncRequest, SyncResponse};

const MAX_HEAD: usize = 64 * 1024;

pub fn bind(options: &ServerOptions) -> std::io::Result<TcpListener> {
    let addr = if options.use_ipv6 {
        format!("[{}]:{}", options.bind_addr, options.port)
    } else {
        format!("{}:{}", options.bind_addr, options.port)
    };
    TcpListener::bind(addr)
}

/// Accept connections until the listener fails.
pub fn serve(
    listener: TcpListener,
    handler: Arc<dyn SyncHandler>,
    use_threading: bool,
    sink: Arc<dyn LogSink>,
) -> anyhow::Result<()> {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                continue;
            }
        };

        let handler = handler.clone();
        let sink = sink.clone();
        if use_threading {
            std::thread::spawn(move || handle_connection(stream, handler, sink));
        } else {
            handle_connection(stream, handler, sink);
        }
    }
    Ok(())
}

fn handle_connection(stream: TcpStream, handler: Arc<dyn SyncHandler>, sink: Arc<dyn LogSink>) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    if let Err(err) = drive(stream, &peer, handler.as_ref(), sink.as_ref()) {
        tracing::error!(client = %peer, error = %err, "connection error");
    }
}

fn drive(
    mut stream: TcpStream,
    peer: &str,
    handler: &dyn SyncHandler,
    sink: &dyn LogSink,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let Some(head) = read_head(&mut stream)? else {
        // Client connected and left without sending a request.
        return Ok(());
    };
    let (method, path) = parse_request_line(&head)?;

    let request = SyncRequest {
        method: method.clone(),
        path: path.clone(),
        client: peer.to_string(),
    };
    let response = handler.call(&request);
    write_response(&mut stream, &response)?;

    sink.log_action(&RequestLogEvent {
        protocol: "http".to_string(),
        action: "complete".to_string(),
        method,
        path,
        status: i32::from(response.status),
        time_taken: started.elapsed().as_secs_f64(),
        client: peer.to_string(),
    });
    Ok(())
}

fn read_head(stream: &mut TcpStream) -> anyhow::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            buffer.truncate(end + 4);
            return Ok(Some(buffer));
        }
        if buffer.len() > MAX_HEAD {
            bail!("request head too large");
        }

        let n = stream.read(&mut chunk)?;
        if n == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            bail!("connection closed mid-request");
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

fn parse_request_line(head: &[u8]) -> anyhow::Result<(String, String)> {
    let text = std::str::from_utf8(head).context("request head is not valid UTF-8")?;
    let line = text.lines().next().context("empty request")?;
    let mut parts = line.split_whitespace();
    let method = parts.next().context("missing method")?;
    let path = parts.next().context("missing request target")?;
    Ok((method.to_string(), path.to_string()))
}

fn write_response(stream: &mut TcpStream, response: &SyncResponse) -> anyhow::Result<()> {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(
        format!(
            "HTTP/1.1 {} {}\r\n",
            response.status,
            reason_phrase(response.status)
        )
        .as_bytes(),
    );
    for (name, value) in &response.headers {
        buffer.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    let has_length = response
        .headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-length"));
    if !has_length {
        buffer.extend_from_slice(format!("Content-Length: {}\r\n", response.body.len()).as_bytes());
    }
    buffer.extend_from_slice(b"Connection: close\r\n\r\n");
    buffer.extend_from_slice(&response.body);

    stream.write_all(&buffer)?;
    stream.flush()?;
    Ok(())
}
