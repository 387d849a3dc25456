//! Asynchronous (ASGI-style) backend.
//!
//! One logical server bound to every endpoint descriptor, one tokio task
//! per accepted connection. The application is driven through the native
//! scope/receive/send convention; an optional per-request timeout bounds
//! how long a request may stay open.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::app::asgi::{AsgiApplication, AsgiMessage, Scope};
use crate::config::ServerOptions;
use crate::endpoints::{build_endpoint_description_strings, parse_endpoint};
use crate::error::{LaunchError, describe_bind_error};
use crate::logaction::{LogSink, RequestLogEvent};
use crate::server::reason_phrase;

const MAX_HEAD: usize = 64 * 1024;
const CHANNEL_CAPACITY: usize = 8;

/// Bind a listener for every endpoint descriptor.
///
/// Bind refusals become [`LaunchError::Bind`] and propagate; the caller
/// decides whether that is fatal.
pub async fn bind(options: &ServerOptions) -> anyhow::Result<Vec<TcpListener>> {
    let endpoints = build_endpoint_description_strings(&options.bind_addr, options.port);
    let mut listeners = Vec::with_capacity(endpoints.len());
    for descriptor in &endpoints {
        let (interface, port) = parse_endpoint(descriptor)
            .with_context(|| format!("unsupported endpoint descriptor {descriptor:?}"))?;
        let addr = if interface.contains(':') {
            format!("[{interface}]:{port}")
        } else {
            format!("{interface}:{port}")
        };
        let listener = TcpListener::bind(&addr).await.map_err(|err| LaunchError::Bind {
            detail: describe_bind_error(&err),
            source: err,
        })?;
        listeners.push(listener);
    }
    Ok(listeners)
}

/// Accept connections on every listener until one fails.
pub async fn serve(
    listeners: Vec<TcpListener>,
    app: Arc<dyn AsgiApplication>,
    sink: Arc<dyn LogSink>,
    root_path: String,
    http_timeout: Option<u64>,
) -> anyhow::Result<()> {
    let mut tasks = Vec::with_capacity(listeners.len());
    for listener in listeners {
        let app = app.clone();
        let sink = sink.clone();
        let root_path = root_path.clone();
        tasks.push(tokio::spawn(accept_loop(
            listener,
            app,
            sink,
            root_path,
            http_timeout,
        )));
    }
    for task in tasks {
        task.await??;
    }
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    app: Arc<dyn AsgiApplication>,
    sink: Arc<dyn LogSink>,
    root_path: String,
    http_timeout: Option<u64>,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        let app = app.clone();
        let sink = sink.clone();
        let root_path = root_path.clone();
        tokio::spawn(async move {
            if let Err(err) =
                handle_connection(socket, peer, app, sink, root_path, http_timeout).await
            {
                tracing::error!(client = %peer, error = %err, "connection error");
            }
        });
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    app: Arc<dyn AsgiApplication>,
    sink: Arc<dyn LogSink>,
    root_path: String,
    http_timeout: Option<u64>,
) -> anyhow::Result<()> {
    let started = Instant::now();

    let mut buffer = BytesMut::with_capacity(4096);
    let head = loop {
        if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break buffer.split_to(end + 4);
        }
        if buffer.len() > MAX_HEAD {
            bail!("request head too large");
        }
        let n = socket.read_buf(&mut buffer).await?;
        if n == 0 {
            if buffer.is_empty() {
                return Ok(());
            }
            bail!("connection closed mid-request");
        }
    };

    let head_text = std::str::from_utf8(&head).context("request head is not valid UTF-8")?;
    let mut lines = head_text.lines();
    let request_line = lines.next().context("empty request")?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().context("missing method")?.to_string();
    let path = parts.next().context("missing request target")?.to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < content_length {
        let n = socket.read_buf(&mut buffer).await?;
        if n == 0 {
            bail!("connection closed mid-body");
        }
    }
    let body = buffer.split_to(content_length.min(buffer.len())).freeze();

    let scope = Scope {
        method: method.clone(),
        path: path.clone(),
        root_path,
        client: peer.to_string(),
    };

    let (request_tx, request_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (response_tx, mut response_rx) = mpsc::channel(CHANNEL_CAPACITY);
    request_tx
        .send(AsgiMessage::HttpRequest {
            body,
            more_body: false,
        })
        .await
        .ok();
    drop(request_tx);

    let app_future = app.call(scope, request_rx, response_tx);
    let drive = async {
        let (app_result, status) =
            tokio::join!(app_future, write_response(&mut socket, &mut response_rx));
        app_result?;
        status
    };

    let status = match http_timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), drive)
            .await
            .context("request timed out")??,
        None => drive.await?,
    };

    sink.log_action(&RequestLogEvent {
        protocol: "http".to_string(),
        action: "complete".to_string(),
        method,
        path,
        status,
        time_taken: started.elapsed().as_secs_f64(),
        client: peer.to_string(),
    });
    Ok(())
}

async fn write_response(
    socket: &mut TcpStream,
    responses: &mut mpsc::Receiver<AsgiMessage>,
) -> anyhow::Result<i32> {
    let mut status: i32 = 0;
    let mut started = false;
    while let Some(message) = responses.recv().await {
        match message {
            AsgiMessage::ResponseStart {
                status: code,
                headers,
            } => {
                if started {
                    bail!("application sent a second response start");
                }
                started = true;
                status = i32::from(code);

                let mut head = format!("HTTP/1.1 {} {}\r\n", code, reason_phrase(code));
                for (name, value) in &headers {
                    head.push_str(name);
                    head.push_str(": ");
                    head.push_str(value);
                    head.push_str("\r\n");
                }
                head.push_str("Connection: close\r\n\r\n");
                socket.write_all(head.as_bytes()).await?;
            }
            AsgiMessage::ResponseBody { body, more_body } => {
                if !started {
                    bail!("application sent a body before the response start");
                }
                socket.write_all(&body).await?;
                if !more_body {
                    break;
                }
            }
            AsgiMessage::HttpRequest { .. } => {}
        }
    }
    if !started {
        bail!("application produced no response");
    }
    socket.flush().await?;
    Ok(status)
}
