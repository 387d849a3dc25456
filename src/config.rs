//! Settings and resolved server options.
//!
//! `Settings` mirrors the project-level configuration an application
//! framework would supply: the application path, debug flag, static file
//! layout. It is loaded from a YAML file named by `DEVSERVE_SETTINGS`, or
//! falls back to built-in defaults. `ServerOptions` is the immutable result
//! of merging settings with the CLI, consumed by the bootstrap.

use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

/// Which serving stack to start. Exactly one is active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Wsgi,
    Asgi,
}

impl Protocol {
    pub fn server_type(self) -> &'static str {
        match self {
            Protocol::Wsgi => "WSGI",
            Protocol::Asgi => "ASGI",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Registry path of the ASGI application; absent means the default app.
    pub asgi_application: Option<String>,
    pub debug: bool,
    /// Root path prefix forced onto every request scope.
    pub force_script_name: Option<String>,
    /// Whether the project carries static-files support at all.
    pub staticfiles_installed: bool,
    pub static_url: String,
    pub static_root: Option<PathBuf>,
    pub shutdown_message: Option<String>,
    /// Where these settings came from, for the startup banner.
    #[serde(skip)]
    pub source: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asgi_application: None,
            debug: true,
            force_script_name: None,
            staticfiles_installed: true,
            static_url: "/static/".to_string(),
            static_root: None,
            shutdown_message: None,
            source: "defaults".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the file named by `DEVSERVE_SETTINGS`, or defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("DEVSERVE_SETTINGS") {
            Ok(path) => Self::from_file(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {path}"))?;
        let mut settings: Settings = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {path}"))?;
        settings.source = path.to_string();
        Ok(settings)
    }
}

/// Fully resolved launch options. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub bind_addr: String,
    pub port: u16,
    pub use_ipv6: bool,
    /// The address was given as a bracketed IPv6 literal (banner display).
    pub raw_ipv6: bool,
    pub protocol: Protocol,
    pub use_static_handler: bool,
    pub insecure_serving: bool,
    pub debug: bool,
    pub use_threading: bool,
    /// True when an external auto-reload supervisor owns the process; the
    /// async backend then leaves interrupt signals alone.
    pub use_reloader: bool,
    pub http_timeout: Option<u64>,
    pub shutdown_message: Option<String>,
}

impl ServerOptions {
    /// The address as it should appear in a URL.
    pub fn display_addr(&self) -> String {
        if self.raw_ipv6 || self.use_ipv6 {
            format!("[{}]", self.bind_addr)
        } else {
            self.bind_addr.clone()
        }
    }
}
