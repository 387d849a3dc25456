//! Tests for application resolution

use std::sync::Arc;

use devserve::app::asgi::{AsgiHandle, DefaultAsgiApplication};
use devserve::app::registry::AppRegistry;
use devserve::app::resolver::resolve;

fn default_factory() -> AsgiHandle {
    AsgiHandle::Native(Arc::new(DefaultAsgiApplication))
}

#[test]
fn test_no_configured_path_falls_back_to_default() {
    let registry = AppRegistry::new();
    let handle = resolve(None, &registry, default_factory);
    assert!(handle.is_ok());
}

#[test]
fn test_registered_path_resolves() {
    let mut registry = AppRegistry::new();
    registry.register("demo.asgi.application", || {
        AsgiHandle::Native(Arc::new(DefaultAsgiApplication))
    });
    let handle = resolve(Some("demo.asgi.application"), &registry, default_factory);
    assert!(handle.is_ok());
}

#[test]
fn test_unresolvable_path_is_a_configuration_error() {
    let registry = AppRegistry::new();
    let err = resolve(Some("nonexistent.module.app"), &registry, default_factory)
        .err()
        .expect("lookup miss must fail");
    let message = err.to_string();
    assert!(
        message.contains("nonexistent.module.app"),
        "message must carry the attempted path: {message}"
    );
    assert!(message.contains("could not be loaded"));
}
