//! Tests for handler chain construction

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use devserve::app::asgi::{
    AppFuture, AsgiApplication, AsgiHandle, AsgiInstance, AsgiMessage, LegacyAsgiApplication,
    Receive, Scope, Send as SendChannel,
};
use devserve::app::registry::AppRegistry;
use devserve::config::{Protocol, ServerOptions, Settings};
use devserve::handler::{ApplicationHandle, build_handler};
use devserve::wsgi::{SyncHandler, SyncRequest, SyncResponse};

fn options(protocol: Protocol, debug: bool, insecure: bool) -> ServerOptions {
    ServerOptions {
        bind_addr: "127.0.0.1".to_string(),
        port: 8000,
        use_ipv6: false,
        raw_ipv6: false,
        protocol,
        use_static_handler: true,
        insecure_serving: insecure,
        debug,
        use_threading: true,
        use_reloader: true,
        http_timeout: None,
        shutdown_message: None,
    }
}

/// Application answering 200 "app" on every path, whatever the scope.
struct EchoApp;

impl AsgiApplication for EchoApp {
    fn call(&self, _scope: Scope, _receive: Receive, send: SendChannel) -> AppFuture<'_> {
        Box::pin(async move {
            send.send(AsgiMessage::ResponseStart {
                status: 200,
                headers: vec![],
            })
            .await?;
            send.send(AsgiMessage::ResponseBody {
                body: Bytes::from_static(b"app"),
                more_body: false,
            })
            .await?;
            Ok(())
        })
    }
}

/// Two-stage application: takes the scope first, then the channels.
struct LegacyApp;

struct LegacyInstance {
    scope: Scope,
}

impl LegacyAsgiApplication for LegacyApp {
    fn application(&self, scope: Scope) -> Box<dyn AsgiInstance> {
        Box::new(LegacyInstance { scope })
    }
}

impl AsgiInstance for LegacyInstance {
    fn run(self: Box<Self>, _receive: Receive, send: SendChannel) -> AppFuture<'static> {
        Box::pin(async move {
            send.send(AsgiMessage::ResponseStart {
                status: 200,
                headers: vec![],
            })
            .await?;
            send.send(AsgiMessage::ResponseBody {
                body: Bytes::from(format!("legacy:{}", self.scope.path)),
                more_body: false,
            })
            .await?;
            Ok(())
        })
    }
}

/// Drive a built handle through one request and collect the response.
async fn drive(handle: &ApplicationHandle, path: &str) -> (u16, Vec<u8>) {
    let ApplicationHandle::Asgi(app) = handle else {
        panic!("expected an async handle");
    };

    let (request_tx, request_rx) = mpsc::channel(8);
    let (response_tx, mut response_rx) = mpsc::channel(8);
    request_tx
        .send(AsgiMessage::HttpRequest {
            body: Bytes::new(),
            more_body: false,
        })
        .await
        .unwrap();
    drop(request_tx);

    let scope = Scope {
        method: "GET".to_string(),
        path: path.to_string(),
        root_path: String::new(),
        client: "test:0".to_string(),
    };
    app.call(scope, request_rx, response_tx).await.unwrap();

    let mut status = 0;
    let mut body = Vec::new();
    while let Some(message) = response_rx.recv().await {
        match message {
            AsgiMessage::ResponseStart { status: code, .. } => status = code,
            AsgiMessage::ResponseBody { body: chunk, .. } => body.extend_from_slice(&chunk),
            AsgiMessage::HttpRequest { .. } => {}
        }
    }
    (status, body)
}

fn registry_with_echo() -> AppRegistry {
    let mut registry = AppRegistry::new();
    registry.register("demo.asgi.application", || {
        AsgiHandle::Native(Arc::new(EchoApp))
    });
    registry
}

fn settings_with_static(dir: &std::path::Path) -> Settings {
    Settings {
        asgi_application: Some("demo.asgi.application".to_string()),
        static_root: Some(dir.to_path_buf()),
        ..Settings::default()
    }
}

#[test]
fn test_wsgi_protocol_delegates_to_the_legacy_factory() {
    struct Marker;
    impl SyncHandler for Marker {
        fn call(&self, _request: &SyncRequest) -> SyncResponse {
            SyncResponse::html(200, "marker")
        }
    }

    let handle = build_handler(
        &options(Protocol::Wsgi, true, false),
        &Settings::default(),
        &AppRegistry::new(),
        || Arc::new(Marker),
    )
    .unwrap();

    let ApplicationHandle::Wsgi(handler) = handle else {
        panic!("expected a sync handle");
    };
    let response = handler.call(&SyncRequest {
        method: "GET".to_string(),
        path: "/".to_string(),
        client: "test:0".to_string(),
    });
    assert_eq!(response.body, b"marker");
}

#[tokio::test]
async fn test_debug_enables_the_static_layer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), b"static bytes").unwrap();

    let handle = build_handler(
        &options(Protocol::Asgi, true, false),
        &settings_with_static(dir.path()),
        &registry_with_echo(),
        devserve::wsgi::default_legacy_factory,
    )
    .unwrap();

    let (status, body) = drive(&handle, "/static/hello.txt").await;
    assert_eq!(status, 200);
    assert_eq!(body, b"static bytes");

    // Non-static paths still reach the application.
    let (status, body) = drive(&handle, "/anything").await;
    assert_eq!(status, 200);
    assert_eq!(body, b"app");
}

#[tokio::test]
async fn test_no_debug_and_no_override_skips_the_static_layer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), b"static bytes").unwrap();

    let handle = build_handler(
        &options(Protocol::Asgi, false, false),
        &settings_with_static(dir.path()),
        &registry_with_echo(),
        devserve::wsgi::default_legacy_factory,
    )
    .unwrap();

    // The application answers instead of the file system.
    let (status, body) = drive(&handle, "/static/hello.txt").await;
    assert_eq!(status, 200);
    assert_eq!(body, b"app");
}

#[tokio::test]
async fn test_insecure_override_enables_static_without_debug() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), b"static bytes").unwrap();

    let handle = build_handler(
        &options(Protocol::Asgi, false, true),
        &settings_with_static(dir.path()),
        &registry_with_echo(),
        devserve::wsgi::default_legacy_factory,
    )
    .unwrap();

    let (_, body) = drive(&handle, "/static/hello.txt").await;
    assert_eq!(body, b"static bytes");
}

#[tokio::test]
async fn test_missing_static_file_is_a_404() {
    let dir = tempfile::tempdir().unwrap();

    let handle = build_handler(
        &options(Protocol::Asgi, true, false),
        &settings_with_static(dir.path()),
        &registry_with_echo(),
        devserve::wsgi::default_legacy_factory,
    )
    .unwrap();

    let (status, _) = drive(&handle, "/static/missing.txt").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_adapter_presents_a_legacy_application_natively() {
    let mut registry = AppRegistry::new();
    registry.register("demo.asgi.application", || {
        AsgiHandle::Legacy(Arc::new(LegacyApp))
    });

    let handle = build_handler(
        &options(Protocol::Asgi, false, false),
        &Settings {
            asgi_application: Some("demo.asgi.application".to_string()),
            ..Settings::default()
        },
        &registry,
        devserve::wsgi::default_legacy_factory,
    )
    .unwrap();

    let (status, body) = drive(&handle, "/somewhere").await;
    assert_eq!(status, 200);
    assert_eq!(body, b"legacy:/somewhere");
}

#[tokio::test]
async fn test_default_application_serves_the_root() {
    let handle = build_handler(
        &options(Protocol::Asgi, false, false),
        &Settings {
            staticfiles_installed: false,
            ..Settings::default()
        },
        &AppRegistry::new(),
        devserve::wsgi::default_legacy_factory,
    )
    .unwrap();

    let (status, _) = drive(&handle, "/").await;
    assert_eq!(status, 200);
    let (status, _) = drive(&handle, "/nope").await;
    assert_eq!(status, 404);
}
