use axum::http::HeaderMap;
use std::net::SocketAddr;

const FORWARDED_FOR: &str = "x-forwarded-for";

// Identify the caller: first X-Forwarded-For hop, then the peer address
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.168.1.7:51000".parse().unwrap())
    }

    #[test]
    fn prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));
        assert_eq!(client_identifier(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_peer_ip_without_port() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(""));
        assert_eq!(client_identifier(&headers, peer()), "192.168.1.7");
        assert_eq!(client_identifier(&HeaderMap::new(), peer()), "192.168.1.7");
    }

    #[test]
    fn unknown_without_any_source() {
        assert_eq!(client_identifier(&HeaderMap::new(), None), "unknown");
    }
}
