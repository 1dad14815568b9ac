//! HTTP fetching for registries and blueprint archives

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use reqwest::header::ACCEPT;
use tracing::debug;
use url::Url;

/// Thin wrapper over a reqwest client with the tool's user agent
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a new fetcher with a custom user agent
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// GET `url` and return the body bytes
    ///
    /// Any non-2xx status fails with a fetch error carrying the status code and
    /// the response body text.
    pub async fn fetch(&self, url: &str, accept: &str, cancel: &CancelToken) -> Result<Vec<u8>> {
        let parsed =
            Url::parse(url).map_err(|e| Error::fetch(url, None, format!("invalid URL: {}", e)))?;
        debug!(url = %parsed, "fetching");

        cancel.run(self.get(parsed, accept)).await
    }

    async fn get(&self, url: Url, accept: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| Error::fetch(url.as_str(), None, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::fetch(url.as_str(), Some(status.as_u16()), body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::fetch(url.as_str(), Some(status.as_u16()), e))?;
        Ok(bytes.to_vec())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(concat!("blueprint-core/", env!("CARGO_PKG_VERSION")))
    }
}

/// Whether a location string should be fetched over HTTP rather than read from disk
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal single-request HTTP server for exercising fetch paths

    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serve exactly one response and return the base URL plus a receiver for the raw request
    pub fn serve_once(
        status_line: &'static str,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 8192];
            let mut request = Vec::new();
            loop {
                let n = stream.read(&mut buf).unwrap_or(0);
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                content_type,
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        });

        (format!("http://{}", addr), rx)
    }
}
