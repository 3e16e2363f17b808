use axum::http::{HeaderMap, StatusCode};
use std::env;
use std::error::Error;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::time::timeout;

pub fn internal_error<E>(err: E) -> (StatusCode, String)
where
    E: Error,
{
    tracing::error!("{}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

pub async fn with_timeout<F: Future>(
    duration_in_mills: u64,
    task: F,
) -> Result<<F as Future>::Output, (StatusCode, String)> {
    timeout(Duration::from_millis(duration_in_mills), task)
        .await
        .map_err(internal_error)
}

pub fn get_env(name: &str) -> String {
    env::var(name).expect(&format!("Environment variable {} is required", name))
}

pub fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

pub fn get_header(name: &str, headers: &HeaderMap) -> Option<String> {
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default().to_string())
}

/// Address used for identity lookup. A forwarded address wins over the peer
/// address, which is only safe behind a trusted reverse proxy. Only IPv4
/// peers are looked up; IPv6 clients stay anonymous.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = get_header("X-Forwarded-For", headers) {
        if !forwarded.is_empty() {
            return Some(forwarded);
        }
    }
    match peer.map(|addr| addr.ip()) {
        Some(IpAddr::V4(ip)) => Some(ip.to_string()),
        _ => None,
    }
}

/// Lexically normalizes a path: collapses repeated separators and resolves
/// `.` and `..` segments. An empty relative result is ".".
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            _ => segments.push(segment),
        }
    }
    if rooted {
        format!("/{}", segments.join("/"))
    } else if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn clean_path_normalizes_segments() {
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path("/Page/Sub"), "/Page/Sub");
        assert_eq!(clean_path("/Page/"), "/Page");
        assert_eq!(clean_path("/a//b"), "/a/b");
        assert_eq!(clean_path("/a/./b"), "/a/b");
        assert_eq!(clean_path("/a/../b"), "/b");
        assert_eq!(clean_path("/.."), "/");
        assert_eq!(clean_path("../a"), "../a");
        assert_eq!(clean_path("abc"), "abc");
    }

    #[test]
    fn forwarded_header_wins_over_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("10.0.0.7"));
        let peer: SocketAddr = "192.168.1.1:4000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), Some("10.0.0.7".into()));
    }

    #[test]
    fn peer_address_is_used_when_not_forwarded() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.168.1.1:4000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), Some("192.168.1.1".into()));
    }

    #[test]
    fn ipv6_peer_stays_anonymous() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "[::1]:4000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), None);
        assert_eq!(client_ip(&headers, None), None);
    }
}
