//! Launcher error taxonomy.
//!
//! Two failure classes terminate a run: an application path that cannot be
//! resolved, and a listening socket the OS refuses to bind. Everything else
//! travels as plain `anyhow` context.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum LaunchError {
    /// The configured application path has no registry entry.
    Configuration { path: String },
    /// The OS refused to bind the listening socket.
    Bind { detail: String, source: io::Error },
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::Configuration { path } => {
                write!(
                    f,
                    "ASGI application '{path}' could not be loaded; no such entry is registered"
                )
            }
            LaunchError::Bind { detail, .. } => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::Configuration { .. } => None,
            LaunchError::Bind { source, .. } => Some(source),
        }
    }
}

/// Translate well-known bind failures into a one-line diagnostic.
///
/// Unrecognized errors pass through with their native message.
pub fn describe_bind_error(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            "You don't have permission to access that port.".to_string()
        }
        io::ErrorKind::AddrInUse => "That port is already in use.".to_string(),
        io::ErrorKind::AddrNotAvailable => "That IP address can't be assigned to.".to_string(),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_bind_errors_are_translated() {
        let err = io::Error::new(io::ErrorKind::AddrInUse, "os says no");
        assert_eq!(describe_bind_error(&err), "That port is already in use.");

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "os says no");
        assert_eq!(
            describe_bind_error(&err),
            "You don't have permission to access that port."
        );

        let err = io::Error::new(io::ErrorKind::AddrNotAvailable, "os says no");
        assert_eq!(
            describe_bind_error(&err),
            "That IP address can't be assigned to."
        );
    }

    #[test]
    fn unknown_bind_errors_pass_through() {
        let err = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
        assert_eq!(describe_bind_error(&err), "peer went away");
    }

    #[test]
    fn configuration_error_carries_the_path() {
        let err = LaunchError::Configuration {
            path: "nonexistent.module.app".to_string(),
        };
        assert!(err.to_string().contains("nonexistent.module.app"));
    }
}
