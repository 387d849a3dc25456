//! Application resolution.
//!
//! The single place where a lookup miss becomes a configuration error;
//! callers never see a raw registry miss.

use crate::app::asgi::AsgiHandle;
use crate::app::registry::AppRegistry;
use crate::error::LaunchError;

/// Resolve the configured application path, or fall back to the default.
pub fn resolve(
    configured: Option<&str>,
    registry: &AppRegistry,
    default_factory: impl FnOnce() -> AsgiHandle,
) -> anyhow::Result<AsgiHandle> {
    match configured {
        None => Ok(default_factory()),
        Some(path) => registry.lookup(path).ok_or_else(|| {
            LaunchError::Configuration {
                path: path.to_string(),
            }
            .into()
        }),
    }
}
