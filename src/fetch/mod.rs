// src/fetch/mod.rs

use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

pub mod raw;

pub use raw::save_raw;

/// Download `url` in full. `timeout` bounds the whole exchange, body included.
/// A non-2xx answer is an error; no retries happen here.
pub async fn fetch(client: &Client, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError> {
    debug!(%url, ?timeout, "fetching");
    let resp = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?
        .error_for_status()
        .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;
    debug!(%url, bytes = bytes.len(), "fetched");
    Ok(bytes.to_vec())
}

#[cfg(test)]
pub(crate) mod stub {
    //! Single-purpose HTTP/1.1 server for tests.

    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use url::Url;

    pub enum Reply {
        Ok(Vec<u8>),
        Status(u16),
        Stall(Duration),
        /// 503 for the first `n` requests, then 200 with the body.
        Flaky(usize, Vec<u8>),
    }

    fn ok(body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    fn status(code: u16) -> Vec<u8> {
        format!("HTTP/1.1 {code} Status\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .into_bytes()
    }

    /// Serve `reply` to every connection; returns the URL to fetch and a
    /// counter of requests seen.
    pub async fn serve_counted(reply: Reply) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reply = Arc::new(reply);
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let reply = reply.clone();
                let nth = seen.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = match reply.as_ref() {
                        Reply::Ok(body) => ok(body),
                        Reply::Status(code) => status(*code),
                        Reply::Flaky(failures, _) if nth < *failures => status(503),
                        Reply::Flaky(_, body) => ok(body),
                        Reply::Stall(delay) => {
                            tokio::time::sleep(*delay).await;
                            return;
                        }
                    };
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        let url = Url::parse(&format!("http://{addr}/data.csv")).unwrap();
        (url, hits)
    }

    pub async fn serve(reply: Reply) -> Url {
        serve_counted(reply).await.0
    }

    /// Client that ignores proxy settings from the environment.
    pub fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    /// A URL on a port nobody listens on.
    pub async fn refused() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        Url::parse(&format!("http://{addr}/data.csv")).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::stub::{client, refused, serve, Reply};
    use super::*;

    #[tokio::test]
    async fn test_fetch_ok() {
        let url = serve(Reply::Ok(b"Id;Pais\n1;Brasil\n".to_vec())).await;
        let bytes = fetch(&client(), &url, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bytes, b"Id;Pais\n1;Brasil\n");
    }

    #[tokio::test]
    async fn test_fetch_http_status() {
        let url = serve(Reply::Status(404)).await;
        let err = fetch(&client(), &url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { code: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let url = serve(Reply::Stall(Duration::from_secs(5))).await;
        let err = fetch(&client(), &url, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let url = refused().await;
        let err = fetch(&client(), &url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(
            matches!(err, FetchError::ConnectionFailed { .. }),
            "got {err:?}"
        );
    }
}
