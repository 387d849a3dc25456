//! Command-line surface.
//!
//! Mirrors the classic runserver flag set: an optional `addrport` positional
//! plus switches for the async stack, threading, the reload supervisor, and
//! insecure static serving.

use anyhow::Context;
use clap::Parser;

use crate::config::{Protocol, ServerOptions, Settings};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ADDR: &str = "127.0.0.1";
pub const DEFAULT_ADDR_IPV6: &str = "::1";

#[derive(Debug, Clone, Parser)]
#[command(name = "devserve", version, about = "Lightweight development web server")]
pub struct Cli {
    /// Optional port number, or address:port (IPv6 in brackets)
    #[arg(value_name = "addrport")]
    pub addrport: Option<String>,

    /// Run the ASGI-based server rather than the WSGI-based one
    #[arg(long)]
    pub asgi: bool,

    /// Per-request timeout in seconds (default: no timeout; --asgi only)
    #[arg(long = "http-timeout", value_name = "seconds")]
    pub http_timeout: Option<u64>,

    /// Ignore any external auto-reload supervisor
    #[arg(long)]
    pub noreload: bool,

    /// Handle connections sequentially instead of one thread each
    #[arg(long)]
    pub nothreading: bool,

    /// Serve static files even with debug disabled
    #[arg(long)]
    pub insecure: bool,

    /// Prefer an IPv6 listening socket
    #[arg(short = '6', long)]
    pub ipv6: bool,
}

/// Environment variable a supervising auto-reloader sets on its child.
pub const SUPERVISED_ENV: &str = "DEVSERVE_SUPERVISED";

/// Whether an external auto-reload supervisor owns this process.
///
/// The launcher never starts one itself, so without the marker variable
/// the process handles its own interrupt signals.
pub fn under_supervisor() -> bool {
    std::env::var_os(SUPERVISED_ENV).is_some()
}

impl Cli {
    /// Merge the parsed flags with project settings into launch options.
    ///
    /// `supervised` says whether an auto-reload supervisor owns the
    /// process; `--noreload` overrides it off.
    pub fn server_options(
        &self,
        settings: &Settings,
        supervised: bool,
    ) -> anyhow::Result<ServerOptions> {
        let (addr, port, raw_ipv6) = match &self.addrport {
            Some(value) => parse_addrport(value)?,
            None => (None, DEFAULT_PORT, false),
        };

        let use_ipv6 = self.ipv6 || raw_ipv6;
        let bind_addr = addr.unwrap_or_else(|| {
            if use_ipv6 { DEFAULT_ADDR_IPV6 } else { DEFAULT_ADDR }.to_string()
        });

        Ok(ServerOptions {
            bind_addr,
            port,
            use_ipv6,
            raw_ipv6,
            protocol: if self.asgi {
                Protocol::Asgi
            } else {
                Protocol::Wsgi
            },
            use_static_handler: settings.staticfiles_installed,
            insecure_serving: self.insecure,
            debug: settings.debug,
            use_threading: !self.nothreading,
            use_reloader: supervised && !self.noreload,
            http_timeout: self.http_timeout,
            shutdown_message: settings.shutdown_message.clone(),
        })
    }
}

/// Current UTC time for the startup banner, e.g. `August 25, 2026 - 13:45:10`.
pub fn startup_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format_civil(secs)
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Render a unix timestamp as a civil UTC date and time.
fn format_civil(unix_secs: u64) -> String {
    let secs = unix_secs % 86_400;
    let (hour, minute, second) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    // Days-to-civil conversion over the proleptic Gregorian calendar.
    let z = (unix_secs / 86_400) as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{} {:02}, {} - {:02}:{:02}:{:02}",
        MONTHS[(month - 1) as usize],
        day,
        year,
        hour,
        minute,
        second
    )
}

/// Parse an `addrport` value into `(addr, port, raw_ipv6)`.
///
/// Accepted forms: `8000`, `host:8000`, `[::1]:8000`. A missing address
/// falls back to the loopback default later.
pub fn parse_addrport(value: &str) -> anyhow::Result<(Option<String>, u16, bool)> {
    if let Some(rest) = value.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .with_context(|| format!("malformed IPv6 address in {value:?}"))?;
        let port = tail
            .strip_prefix(':')
            .with_context(|| format!("missing port in {value:?}"))?
            .parse()
            .with_context(|| format!("invalid port in {value:?}"))?;
        return Ok((Some(host.to_string()), port, true));
    }

    match value.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("invalid port in {value:?}"))?;
            let host = (!host.is_empty()).then(|| host.to_string());
            Ok((host, port, false))
        }
        None => {
            let port = value
                .parse()
                .with_context(|| format!("{value:?} is not a valid port number or address:port pair"))?;
            Ok((None, port, false))
        }
    }
}
