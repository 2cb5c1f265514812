//! reqwest implementation of [`TikaService`].

use super::{ServiceResponse, TikaService};
use crate::config::{OcrStrategy, ParserConfig};
use crate::error::{TikaError, TransportError};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Request header selecting the PDF OCR strategy.
pub const OCR_STRATEGY_HEADER: &str = "X-Tika-PDFOcrStrategy";

const JSON: &str = "application/json";
const HTML: &str = "text/html";

/// HTTP client bound to one Tika server.
#[derive(Debug, Clone)]
pub struct TikaClient {
    http: reqwest::Client,
    base_url: String,
    probe_timeout: Duration,
}

impl TikaClient {
    /// Build a client from the parser configuration.
    ///
    /// The request timeout applies to every call; probes override it with
    /// the much shorter `probe_timeout_secs`.
    pub fn new(config: &ParserConfig) -> Result<Self, TikaError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TikaError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            probe_timeout: config.probe_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, accept: Option<&str>) -> Result<ServiceResponse, TransportError> {
        let mut req = self.http.get(self.url(path));
        if let Some(accept) = accept {
            req = req.header(ACCEPT, accept);
        }
        buffer(req.send().await?).await
    }
}

/// Drain a response into a [`ServiceResponse`].
async fn buffer(response: reqwest::Response) -> Result<ServiceResponse, TransportError> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;
    debug!("Tika answered {} ({} bytes)", status, body.len());
    Ok(ServiceResponse {
        status,
        headers,
        body,
    })
}

impl TikaService for TikaClient {
    async fn probe(&self) -> Result<StatusCode, TransportError> {
        let response = self
            .http
            .get(self.url("/tika"))
            .timeout(self.probe_timeout)
            .send()
            .await?;
        Ok(response.status())
    }

    async fn version(&self) -> Result<ServiceResponse, TransportError> {
        self.get("/version", None).await
    }

    async fn parser_details(&self) -> Result<ServiceResponse, TransportError> {
        self.get("/parsers/details", Some(JSON)).await
    }

    async fn put_metadata(&self, document: &[u8]) -> Result<ServiceResponse, TransportError> {
        let response = self
            .http
            .put(self.url("/meta"))
            .header(ACCEPT, JSON)
            .body(document.to_vec())
            .send()
            .await?;
        buffer(response).await
    }

    async fn put_content(
        &self,
        document: &[u8],
        ocr: OcrStrategy,
    ) -> Result<ServiceResponse, TransportError> {
        let response = self
            .http
            .put(self.url("/tika"))
            .header(ACCEPT, HTML)
            .header(OCR_STRATEGY_HEADER, ocr.header_value())
            .body(document.to_vec())
            .send()
            .await?;
        buffer(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let config = ParserConfig {
            base_url: "http://tika:9998/".into(),
            ..ParserConfig::default()
        };
        let client = TikaClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://tika:9998");
        assert_eq!(client.url("/meta"), "http://tika:9998/meta");
    }
}
