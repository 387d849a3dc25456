//! Listen-endpoint descriptors.
//!
//! A descriptor is a string of the form `tcp:port=8000:interface=127.0.0.1`.
//! The builder returns an ordered sequence so that additional transports
//! (e.g. a unix socket alongside TCP) can be added later without changing
//! any caller.

/// Build the endpoint descriptors for a host/port pair.
///
/// Always returns at least one descriptor. Host/port syntax validation is
/// the caller's concern.
pub fn build_endpoint_description_strings(host: &str, port: u16) -> Vec<String> {
    vec![format!("tcp:port={port}:interface={host}")]
}

/// Parse a TCP descriptor back into `(interface, port)`.
///
/// The interface segment is last so IPv6 literals keep their colons.
pub fn parse_endpoint(descriptor: &str) -> Option<(String, u16)> {
    let rest = descriptor.strip_prefix("tcp:")?;
    let rest = rest.strip_prefix("port=")?;
    let (port, rest) = rest.split_once(':')?;
    let interface = rest.strip_prefix("interface=")?;
    Some((interface.to_string(), port.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_single_tcp_descriptor() {
        let endpoints = build_endpoint_description_strings("127.0.0.1", 8000);
        assert_eq!(endpoints, vec!["tcp:port=8000:interface=127.0.0.1"]);
    }

    #[test]
    fn round_trips_ipv6_interfaces() {
        let endpoints = build_endpoint_description_strings("::1", 8000);
        assert_eq!(
            parse_endpoint(&endpoints[0]),
            Some(("::1".to_string(), 8000))
        );
    }

    #[test]
    fn rejects_non_tcp_descriptors() {
        assert_eq!(parse_endpoint("unix:/tmp/sock"), None);
        assert_eq!(parse_endpoint("tcp:port=notaport:interface=x"), None);
    }
}
