//! Synchronous protocol surface.
//!
//! The sync backend drives an opaque [`SyncHandler`]: one call per request,
//! blocking, no streaming. The launcher ships a minimal default handler so
//! it can serve something out of the box; a real project swaps in its own
//! via the legacy handler factory.

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub method: String,
    pub path: String,
    pub client: String,
}

#[derive(Debug, Clone)]
pub struct SyncResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SyncResponse {
    pub fn html(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: b"Not Found".to_vec(),
        }
    }
}

/// One request in, one response out.
pub trait SyncHandler: Send + Sync {
    fn call(&self, request: &SyncRequest) -> SyncResponse;
}

/// Built-in handler serving a welcome page at the root.
pub struct DefaultSyncHandler;

impl SyncHandler for DefaultSyncHandler {
    fn call(&self, request: &SyncRequest) -> SyncResponse {
        if request.path == "/" {
            SyncResponse::html(200, WELCOME_PAGE)
        } else {
            SyncResponse::not_found()
        }
    }
}

pub fn default_legacy_factory() -> Arc<dyn SyncHandler> {
    Arc::new(DefaultSyncHandler)
}

pub(crate) const WELCOME_PAGE: &str = "<!doctype html>\n\
<html><head><title>devserve</title></head>\n\
<body><h1>The development server is running.</h1>\n\
<p>This page is served by the built-in default application.</p></body></html>\n";
