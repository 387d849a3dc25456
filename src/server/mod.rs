//! Server bootstrap.
//!
//! The bootstrap owns the run lifecycle: it binds the listening socket(s),
//! starts exactly one of the two backends, and runs until interrupted.
//!
//! # Lifecycle
//!
//! ```text
//! Idle → Starting → Running → ShuttingDown → Stopped
//!              └──→ Failed (bind refused)
//! ```
//!
//! Bind failures are translated into one-line diagnostics. On the WSGI
//! path the process exits immediately with status 1; on the ASGI path the
//! error propagates to the caller.

pub mod async_server;
pub mod sync;

use std::sync::Arc;

use anyhow::bail;

use crate::app::asgi::AsgiApplication;
use crate::config::{Protocol, ServerOptions};
use crate::error::describe_bind_error;
use crate::handler::ApplicationHandle;
use crate::logaction::LogSink;
use crate::wsgi::SyncHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
    Failed,
}

pub struct Bootstrap {
    options: ServerOptions,
    root_path: String,
    sink: Arc<dyn LogSink>,
    state: ServerState,
}

impl Bootstrap {
    pub fn new(options: ServerOptions, root_path: String, sink: Arc<dyn LogSink>) -> Self {
        Self {
            options,
            root_path,
            sink,
            state: ServerState::Idle,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Run the backend matching the selected protocol until interrupted.
    pub async fn run(&mut self, handle: ApplicationHandle) -> anyhow::Result<()> {
        self.state = ServerState::Starting;
        match (self.options.protocol, handle) {
            (Protocol::Wsgi, ApplicationHandle::Wsgi(handler)) => self.run_wsgi(handler).await,
            (Protocol::Asgi, ApplicationHandle::Asgi(app)) => self.run_asgi(app).await,
            _ => bail!("handler does not match the selected protocol"),
        }
    }

    async fn run_wsgi(&mut self, handler: Arc<dyn SyncHandler>) -> anyhow::Result<()> {
        let listener = match sync::bind(&self.options) {
            Ok(listener) => listener,
            Err(err) => {
                self.state = ServerState::Failed;
                eprintln!("Error: {}", describe_bind_error(&err));
                // The accept loop lives on a blocking worker; an error
                // return from here would race its shutdown with hooks that
                // only the main flow may run.
                std::process::exit(1);
            }
        };
        self.state = ServerState::Running;
        tracing::debug!(
            addr = %self.options.display_addr(),
            port = self.options.port,
            "WSGI server listening"
        );

        let use_threading = self.options.use_threading;
        let sink = self.sink.clone();
        let serve =
            tokio::task::spawn_blocking(move || sync::serve(listener, handler, use_threading, sink));

        tokio::select! {
            result = serve => {
                let result: anyhow::Result<()> = result?;
                result?;
                self.state = ServerState::Stopped;
            }
            _ = tokio::signal::ctrl_c() => {
                self.shutdown();
                // The accept loop blocks in accept() and never finishes;
                // runtime teardown would wait on its worker forever.
                std::process::exit(0);
            }
        }
        Ok(())
    }

    async fn run_asgi(&mut self, app: Arc<dyn AsgiApplication>) -> anyhow::Result<()> {
        let listeners = match async_server::bind(&self.options).await {
            Ok(listeners) => listeners,
            Err(err) => {
                self.state = ServerState::Failed;
                return Err(err);
            }
        };
        self.state = ServerState::Running;
        tracing::debug!(
            addr = %self.options.bind_addr,
            port = self.options.port,
            "ASGI server listening"
        );

        let serve = async_server::serve(
            listeners,
            app,
            self.sink.clone(),
            self.root_path.clone(),
            self.options.http_timeout,
        );

        if self.options.use_reloader {
            // The auto-reload supervisor owns interrupt signals.
            serve.await?;
            self.state = ServerState::Stopped;
        } else {
            tokio::select! {
                result = serve => {
                    result?;
                    self.state = ServerState::Stopped;
                }
                _ = tokio::signal::ctrl_c() => self.shutdown(),
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state = ServerState::ShuttingDown;
        tracing::info!("Shutdown signal received");
        if let Some(message) = &self.options.shutdown_message {
            println!("{message}");
        }
        self.state = ServerState::Stopped;
    }
}

pub(crate) fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}
