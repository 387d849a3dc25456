//! Handler chain construction.
//!
//! Given the resolved options, produces the single handler object the
//! bootstrap will serve: the legacy sync handler unchanged for the WSGI
//! stack, or the resolved async application, optionally wrapped with a
//! static-file layer, always presented through the native-convention
//! adapter. Pure construction; no I/O happens here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::app::asgi::{
    AppFuture, Asgi3Adapter, AsgiApplication, AsgiHandle, AsgiMessage, DefaultAsgiApplication,
    Receive, Scope, Send,
};
use crate::app::registry::AppRegistry;
use crate::app::resolver;
use crate::config::{Protocol, ServerOptions, Settings};
use crate::wsgi::SyncHandler;

/// The finished handler chain, one variant per serving stack.
#[derive(Clone)]
pub enum ApplicationHandle {
    Wsgi(Arc<dyn SyncHandler>),
    Asgi(Arc<dyn AsgiApplication>),
}

/// Build the handler chain for the selected protocol.
///
/// The WSGI path delegates entirely to the legacy factory; the framework
/// upstream already handles static files there. The ASGI path resolves the
/// configured application, wraps it for static serving when the options
/// allow it, and finishes with the convention adapter.
pub fn build_handler(
    options: &ServerOptions,
    settings: &Settings,
    registry: &AppRegistry,
    legacy_factory: impl FnOnce() -> Arc<dyn SyncHandler>,
) -> anyhow::Result<ApplicationHandle> {
    if options.protocol == Protocol::Wsgi {
        return Ok(ApplicationHandle::Wsgi(legacy_factory()));
    }

    let handle = resolver::resolve(settings.asgi_application.as_deref(), registry, || {
        AsgiHandle::Native(Arc::new(DefaultAsgiApplication))
    })?;

    let handle = if options.use_static_handler && (options.debug || options.insecure_serving) {
        let inner: Arc<dyn AsgiApplication> = Arc::new(Asgi3Adapter::wrap(handle));
        AsgiHandle::Native(Arc::new(StaticFilesWrapper::new(
            inner,
            settings.static_url.clone(),
            settings.static_root.clone(),
        )))
    } else {
        handle
    };

    Ok(ApplicationHandle::Asgi(Arc::new(Asgi3Adapter::wrap(
        handle,
    ))))
}

/// Serves files under the static URL prefix, delegating everything else.
pub struct StaticFilesWrapper {
    inner: Arc<dyn AsgiApplication>,
    static_url: String,
    static_root: Option<PathBuf>,
}

impl StaticFilesWrapper {
    pub fn new(
        inner: Arc<dyn AsgiApplication>,
        static_url: String,
        static_root: Option<PathBuf>,
    ) -> Self {
        Self {
            inner,
            static_url,
            static_root,
        }
    }

    async fn serve(&self, rest: &str, send: Send) -> anyhow::Result<()> {
        let file = match &self.static_root {
            Some(root) => resolve_static_path(root, rest),
            None => None,
        };

        let (status, content_type, body) = match file {
            Some(path) => match tokio::fs::read(&path).await {
                Ok(contents) => (200, content_type_for(&path), Bytes::from(contents)),
                Err(_) => (404, "text/plain", Bytes::from_static(b"Not Found")),
            },
            None => (404, "text/plain", Bytes::from_static(b"Not Found")),
        };

        send.send(AsgiMessage::ResponseStart {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
        })
        .await?;
        send.send(AsgiMessage::ResponseBody {
            body,
            more_body: false,
        })
        .await?;
        Ok(())
    }
}

impl AsgiApplication for StaticFilesWrapper {
    fn call(&self, scope: Scope, receive: Receive, send: Send) -> AppFuture<'_> {
        Box::pin(async move {
            let rest = scope
                .path
                .strip_prefix(&self.static_url)
                .map(str::to_string);
            match rest {
                Some(rest) => {
                    drop(receive);
                    self.serve(&rest, send).await
                }
                None => self.inner.call(scope, receive, send).await,
            }
        })
    }
}

/// Map a URL suffix onto a file below the static root.
///
/// Rejects empty, dot and parent components so requests cannot escape the
/// root.
fn resolve_static_path(root: &Path, rest: &str) -> Option<PathBuf> {
    if rest.is_empty() {
        return None;
    }
    let mut path = root.to_path_buf();
    for component in rest.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return None;
        }
        path.push(component);
    }
    Some(path)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_paths_cannot_escape_the_root() {
        let root = Path::new("/srv/static");
        assert_eq!(
            resolve_static_path(root, "css/site.css"),
            Some(PathBuf::from("/srv/static/css/site.css"))
        );
        assert_eq!(resolve_static_path(root, "../secret"), None);
        assert_eq!(resolve_static_path(root, "a//b"), None);
        assert_eq!(resolve_static_path(root, ""), None);
    }

    #[test]
    fn content_types_cover_common_extensions() {
        assert_eq!(content_type_for(Path::new("a.css")), "text/css");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
