use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::common::Coordinates;

pub const UPLOAD_PATH: &str = "/upload-location";
pub const FETCH_ALL_PATH: &str = "/get-all-locations";
pub const DELETE_ALL_PATH: &str = "/delete-all-locations";

/// Remote store of location records. Payloads are returned as-is.
#[async_trait]
pub trait LocationBackend: Send + Sync {
    async fn upload(&self, position: Coordinates) -> Result<Value>;
    async fn fetch_all(&self) -> Result<Value>;
    async fn delete_all(&self) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UploadBody {
    pub lat: f64,
    pub long: f64,
}

impl From<Coordinates> for UploadBody {
    fn from(c: Coordinates) -> Self {
        Self {
            lat: c.latitude,
            long: c.longitude,
        }
    }
}

pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_payload(response: reqwest::Response) -> Result<Value> {
        let response = response.error_for_status()?;
        let text = response.text().await.context("Failed to read response body")?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[async_trait]
impl LocationBackend for HttpBackend {
    async fn upload(&self, position: Coordinates) -> Result<Value> {
        let url = self.url(UPLOAD_PATH);
        debug!(target: "geotrack::api", "POST {} ({})", url, position);
        let response = self
            .client
            .post(&url)
            .json(&UploadBody::from(position))
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        Self::read_payload(response).await
    }

    async fn fetch_all(&self) -> Result<Value> {
        let url = self.url(FETCH_ALL_PATH);
        debug!(target: "geotrack::api", "GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        Self::read_payload(response).await
    }

    async fn delete_all(&self) -> Result<Value> {
        let url = self.url(DELETE_ALL_PATH);
        debug!(target: "geotrack::api", "DELETE {}", url);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;
        Self::read_payload(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    struct Captured {
        head: String,
        body: String,
    }

    /// Serves exactly one request and hands back what the client sent.
    async fn one_shot_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            let head_end = loop {
                let n = sock.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if n == 0 {
                    break raw.len();
                }
            };
            let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while raw.len() < head_end + content_length {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let req_body = String::from_utf8_lossy(&raw[head_end..]).to_string();

            let resp = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            let _ = tx.send(Captured {
                head,
                body: req_body,
            });
        });

        (base, rx)
    }

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_upload_body_field_names() {
        let body = UploadBody::from(Coordinates::new(37.4219983, -122.084));
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json, serde_json::json!({"lat": 37.4219983, "long": -122.084}));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let b = backend("https://tracker.example.org/api/");
        assert_eq!(
            b.url(UPLOAD_PATH),
            "https://tracker.example.org/api/upload-location"
        );
    }

    #[tokio::test]
    async fn test_upload_posts_lat_long() {
        let (base, rx) = one_shot_server("200 OK", r#"{"message":"Location saved"}"#).await;
        let payload = backend(&base)
            .upload(Coordinates::new(12.5, -8.25))
            .await
            .unwrap();
        assert_eq!(payload["message"], "Location saved");

        let req = rx.await.unwrap();
        assert!(req.head.starts_with("POST /upload-location HTTP/1.1"));
        let sent: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(sent, serde_json::json!({"lat": 12.5, "long": -8.25}));
    }

    #[tokio::test]
    async fn test_fetch_all_sends_no_body() {
        let (base, rx) = one_shot_server("200 OK", r#"[{"lat":1.0,"long":2.0}]"#).await;
        let payload = backend(&base).fetch_all().await.unwrap();
        assert_eq!(payload[0]["long"], 2.0);

        let req = rx.await.unwrap();
        assert!(req.head.starts_with("GET /get-all-locations HTTP/1.1"));
        assert!(req.body.is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_sends_no_body() {
        let (base, rx) = one_shot_server("200 OK", "").await;
        let payload = backend(&base).delete_all().await.unwrap();
        assert_eq!(payload, Value::Null);

        let req = rx.await.unwrap();
        assert!(req.head.starts_with("DELETE /delete-all-locations HTTP/1.1"));
        assert!(req.body.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_is_kept_as_text() {
        let (base, _rx) = one_shot_server("200 OK", "deleted").await;
        let payload = backend(&base).delete_all().await.unwrap();
        assert_eq!(payload, Value::String("deleted".into()));
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let (base, _rx) = one_shot_server("500 Internal Server Error", "{}").await;
        assert!(backend(&base).fetch_all().await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        assert!(backend(&base).upload(Coordinates::new(0.0, 0.0)).await.is_err());
    }
}
