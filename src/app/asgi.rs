//! Asynchronous protocol surface.
//!
//! Applications receive a connection [`Scope`] plus a pair of message
//! channels. Two calling conventions exist in the wild: the native one
//! takes all three at once; the legacy one is two-stage, taking the scope
//! first and returning an instance that is then driven with the channels.
//! [`Asgi3Adapter`] presents either style through the native convention,
//! with the variant resolved once at wrap time.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Per-connection metadata handed to the application.
#[derive(Debug, Clone)]
pub struct Scope {
    pub method: String,
    pub path: String,
    /// Prefix the application is mounted under (force-script-name).
    pub root_path: String,
    pub client: String,
}

/// Messages flowing between server and application.
#[derive(Debug, Clone)]
pub enum AsgiMessage {
    HttpRequest {
        body: Bytes,
        more_body: bool,
    },
    ResponseStart {
        status: u16,
        headers: Vec<(String, String)>,
    },
    ResponseBody {
        body: Bytes,
        more_body: bool,
    },
}

pub type Receive = mpsc::Receiver<AsgiMessage>;
pub type Send = mpsc::Sender<AsgiMessage>;

pub type AppFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + std::marker::Send + 'a>>;

/// Native three-argument calling convention.
pub trait AsgiApplication: std::marker::Send + Sync {
    fn call(&self, scope: Scope, receive: Receive, send: Send) -> AppFuture<'_>;
}

/// Legacy two-stage convention: scope first, then a driven instance.
pub trait LegacyAsgiApplication: std::marker::Send + Sync {
    fn application(&self, scope: Scope) -> Box<dyn AsgiInstance>;
}

pub trait AsgiInstance: std::marker::Send {
    fn run(self: Box<Self>, receive: Receive, send: Send) -> AppFuture<'static>;
}

/// Handle to a resolved application, before convention adaptation.
#[derive(Clone)]
pub enum AsgiHandle {
    Native(Arc<dyn AsgiApplication>),
    Legacy(Arc<dyn LegacyAsgiApplication>),
}

/// Presents any [`AsgiHandle`] through the native calling convention.
pub enum Asgi3Adapter {
    Native(Arc<dyn AsgiApplication>),
    Legacy(Arc<dyn LegacyAsgiApplication>),
}

impl Asgi3Adapter {
    /// Detect the wrapped convention once, at wrap time.
    pub fn wrap(handle: AsgiHandle) -> Self {
        match handle {
            AsgiHandle::Native(app) => Asgi3Adapter::Native(app),
            AsgiHandle::Legacy(app) => Asgi3Adapter::Legacy(app),
        }
    }
}

impl AsgiApplication for Asgi3Adapter {
    fn call(&self, scope: Scope, receive: Receive, send: Send) -> AppFuture<'_> {
        match self {
            Asgi3Adapter::Native(app) => app.call(scope, receive, send),
            Asgi3Adapter::Legacy(app) => {
                let instance = app.application(scope);
                instance.run(receive, send)
            }
        }
    }
}

/// Built-in default application: welcome page at the root, 404 elsewhere.
pub struct DefaultAsgiApplication;

impl AsgiApplication for DefaultAsgiApplication {
    fn call(&self, scope: Scope, mut receive: Receive, send: Send) -> AppFuture<'_> {
        Box::pin(async move {
            // Drain the request body before responding.
            while let Some(message) = receive.recv().await {
                if let AsgiMessage::HttpRequest { more_body: false, .. } = message {
                    break;
                }
            }

            let (status, body) = if scope.path == "/" {
                (200, Bytes::from_static(crate::wsgi::WELCOME_PAGE.as_bytes()))
            } else {
                (404, Bytes::from_static(b"Not Found"))
            };

            send.send(AsgiMessage::ResponseStart {
                status,
                headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            })
            .await?;
            send.send(AsgiMessage::ResponseBody {
                body,
                more_body: false,
            })
            .await?;
            Ok(())
        })
    }
}
