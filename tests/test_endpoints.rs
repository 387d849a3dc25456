//! Tests for endpoint descriptor building

use devserve::endpoints::{build_endpoint_description_strings, parse_endpoint};

#[test]
fn test_single_tcp_descriptor_for_host_and_port() {
    let endpoints = build_endpoint_description_strings("127.0.0.1", 8000);
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0], "tcp:port=8000:interface=127.0.0.1");
}

#[test]
fn test_descriptor_order_is_stable() {
    let first = build_endpoint_description_strings("0.0.0.0", 80);
    let second = build_endpoint_description_strings("0.0.0.0", 80);
    assert_eq!(first, second);
}

#[test]
fn test_descriptors_parse_back_for_binding() {
    for (host, port) in [("127.0.0.1", 8000), ("::1", 8081), ("0.0.0.0", 80)] {
        let endpoints = build_endpoint_description_strings(host, port);
        assert_eq!(
            parse_endpoint(&endpoints[0]),
            Some((host.to_string(), port))
        );
    }
}
