//! Token and proxy file loading
//!
//! Both files are newline-delimited lists; lines are trimmed and blanks are
//! dropped. A missing token file is an error (no accounts means nothing to
//! do), a missing proxy file is not (the run proceeds without proxies).

use crate::error::{Error, Result};
use std::path::Path;
use tracing::{info, warn};

fn parse_lines(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load bearer tokens from a newline-delimited file
///
/// Order is preserved; each line is one account. Returns
/// [`Error::Credentials`] when the file cannot be read.
pub async fn load_tokens(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Credentials(format!("failed to read {}: {e}", path.display())))?;
    let tokens = parse_lines(&data);
    info!(count = tokens.len(), path = %path.display(), "loaded tokens");
    Ok(tokens)
}

/// Load proxy URIs from a newline-delimited file
///
/// A missing or unreadable file is non-fatal: the run proceeds without
/// proxies, so this logs a warning and returns an empty list.
pub async fn load_proxies(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    match tokio::fs::read_to_string(path).await {
        Ok(data) => {
            let proxies = parse_lines(&data);
            if proxies.is_empty() {
                warn!(path = %path.display(), "no proxies found, proceeding without proxy");
            } else {
                info!(count = proxies.len(), path = %path.display(), "loaded proxies");
            }
            proxies
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "proxy file not readable, proceeding without proxy");
            Vec::new()
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn tokens_are_trimmed_and_blank_lines_dropped() {
        let file = write_temp("  token-one  \n\ntoken-two\n   \ntoken-three");
        let tokens = load_tokens(file.path()).await.unwrap();
        assert_eq!(tokens, vec!["token-one", "token-two", "token-three"]);
    }

    #[tokio::test]
    async fn token_order_is_preserved() {
        let file = write_temp("b\na\nc\n");
        let tokens = load_tokens(file.path()).await.unwrap();
        assert_eq!(tokens, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn empty_token_file_yields_empty_list() {
        let file = write_temp("\n\n  \n");
        let tokens = load_tokens(file.path()).await.unwrap();
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn missing_token_file_is_an_error() {
        let result = load_tokens("/nonexistent/tokens.txt").await;
        assert!(matches!(result, Err(Error::Credentials(_))));
    }

    #[tokio::test]
    async fn missing_proxy_file_yields_empty_list() {
        let proxies = load_proxies("/nonexistent/proxies.txt").await;
        assert!(proxies.is_empty());
    }

    #[tokio::test]
    async fn proxy_file_parses_like_token_file() {
        let file = write_temp("http://a:8080\n\nsocks5://b:1080\n");
        let proxies = load_proxies(file.path()).await;
        assert_eq!(proxies, vec!["http://a:8080", "socks5://b:1080"]);
    }
}
