//! Proxy-aware request transport construction
//!
//! Builds the per-account `reqwest::Client` (timeout plus optional proxy
//! transport) and the two header sets the API expects. Proxy transports are
//! selected by URI scheme; an unsupported scheme logs a warning and falls
//! back to a direct connection rather than failing the account.

use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CACHE_CONTROL, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT,
};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Fixed timeout applied to every request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Origin/referer value identifying the API to itself
const API_ORIGIN: &str = "https://api.cryptal.ai";

/// Small fixed pool of browser user agents, picked at random per header set
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/105.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Firefox/102.0",
];

/// Pick a random user agent from the fixed pool
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Full API header set for authenticated calls
///
/// Includes the bearer token, the fixed origin/referer pair, and a random
/// user agent. Fails only when the token contains bytes that are not valid
/// in an HTTP header.
pub fn auth_headers(token: &str) -> Result<HeaderMap> {
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| Error::Credentials("token is not a valid header value".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(ORIGIN, HeaderValue::from_static(API_ORIGIN));
    headers.insert(REFERER, HeaderValue::from_static("https://api.cryptal.ai/"));
    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    Ok(headers)
}

/// Minimal header set for unauthenticated calls (IP lookup)
pub fn standard_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Select a proxy transport for the given URI, by scheme
///
/// `http`/`https` use the HTTP(S) proxy transport, `socks4`/`socks5` the
/// SOCKS transport. Anything else (including unparseable URIs) returns
/// `None` so the caller falls back to a direct connection.
fn proxy_transport(proxy: &str) -> Option<reqwest::Proxy> {
    let scheme = match Url::parse(proxy) {
        Ok(url) => url.scheme().to_string(),
        Err(e) => {
            warn!(proxy = %proxy, error = %e, "unparseable proxy URI, falling back to direct connection");
            return None;
        }
    };

    match scheme.as_str() {
        "http" | "https" | "socks4" | "socks5" => match reqwest::Proxy::all(proxy) {
            Ok(transport) => Some(transport),
            Err(e) => {
                warn!(proxy = %proxy, error = %e, "proxy rejected, falling back to direct connection");
                None
            }
        },
        other => {
            warn!(proxy = %proxy, scheme = %other, "unsupported proxy scheme, falling back to direct connection");
            None
        }
    }
}

/// Build the HTTP client for one account
///
/// Applies the fixed request timeout and, when a proxy is given and its
/// scheme is supported, routes all traffic through it.
pub fn build_client(proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
    if let Some(proxy) = proxy
        && let Some(transport) = proxy_transport(proxy)
    {
        builder = builder.proxy(transport);
    }
    Ok(builder.build()?)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_user_agent_comes_from_pool() {
        for _ in 0..50 {
            let ua = random_user_agent();
            assert!(USER_AGENTS.contains(&ua));
        }
    }

    #[test]
    fn auth_headers_carry_bearer_token_and_api_identity() {
        let headers = auth_headers("my-token-123").unwrap();
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap(),
            "Bearer my-token-123"
        );
        assert_eq!(headers.get(ORIGIN).unwrap(), API_ORIGIN);
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert!(headers.contains_key(USER_AGENT));
    }

    #[test]
    fn auth_headers_reject_invalid_token_bytes() {
        let result = auth_headers("bad\ntoken");
        assert!(matches!(result, Err(Error::Credentials(_))));
    }

    #[test]
    fn standard_headers_are_the_minimal_pair() {
        let headers = standard_headers();
        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key(USER_AGENT));
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn http_and_socks_schemes_get_a_transport() {
        assert!(proxy_transport("http://127.0.0.1:8080").is_some());
        assert!(proxy_transport("https://127.0.0.1:8080").is_some());
        assert!(proxy_transport("socks5://127.0.0.1:1080").is_some());
    }

    #[test]
    fn unsupported_scheme_falls_back_to_direct() {
        assert!(proxy_transport("ftp://127.0.0.1:21").is_none());
        assert!(proxy_transport("not a uri").is_none());
    }

    #[test]
    fn client_builds_with_and_without_proxy() {
        build_client(None).unwrap();
        build_client(Some("http://127.0.0.1:8080")).unwrap();
        // Unsupported scheme must not fail the build
        build_client(Some("ftp://127.0.0.1:21")).unwrap();
    }
}
