use embedded_svc::http::client::Client as HttpClient;
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use esp_idf_svc::io::{utils::try_read_full, EspIOError, Write};
use esp_idf_svc::sys::{esp_crt_bundle_attach, esp_err_t, ESP_ERR_HTTP_EAGAIN, ESP_ERR_TIMEOUT};
use log::*;
use protocol::{WireCommand, WireReport};
use std::time::Duration;

use crate::error::SyncError;

// Responses are a single small JSON object
const RESPONSE_BUF_LEN: usize = 256;

/// JSON-over-HTTP client for the coordinator endpoint.
///
/// The underlying connection is dropped after any transport error and
/// rebuilt on the next request.
pub struct HttpTransport {
    url: String,
    timeout: Duration,
    client: Option<HttpClient<EspHttpConnection>>,
}

impl HttpTransport {
    pub fn new(url: String, timeout: Duration) -> Self {
        info!("Coordinator endpoint: {}", url);
        HttpTransport {
            url,
            timeout,
            client: None,
        }
    }

    /// Forget the current connection.
    pub fn reset(&mut self) {
        self.client = None;
    }

    /// POST the report and parse the returned command.
    pub fn post(&mut self, report: &WireReport) -> Result<WireCommand, SyncError> {
        let body = report.to_json()?;
        let result = self.exchange(&body);
        if let Err(SyncError::Timeout(_) | SyncError::Connection(_)) = result {
            self.reset();
        }
        result
    }

    fn exchange(&mut self, body: &[u8]) -> Result<WireCommand, SyncError> {
        if self.client.is_none() {
            self.client = Some(self.open()?);
        }
        let timeout = self.timeout;
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| SyncError::Connection("HTTP client unavailable".into()))?;

        let content_length = body.len().to_string();
        let headers = [
            ("content-type", "application/json"),
            ("accept", "application/json"),
            ("content-length", content_length.as_str()),
        ];

        let io_error = |e: EspIOError| classify(e, timeout);
        let mut request = client.post(&self.url, &headers).map_err(io_error)?;
        request.write_all(body).map_err(io_error)?;
        request.flush().map_err(io_error)?;
        let mut response = request.submit().map_err(io_error)?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(SyncError::Status(status));
        }

        let mut buf = [0u8; RESPONSE_BUF_LEN];
        let len = try_read_full(&mut response, &mut buf).map_err(|(e, _)| io_error(e))?;
        debug!("Coordinator replied: {:?}", std::str::from_utf8(&buf[..len]));

        Ok(WireCommand::from_json(&buf[..len])?)
    }

    fn open(&self) -> Result<HttpClient<EspHttpConnection>, SyncError> {
        let connection = EspHttpConnection::new(&HttpConfiguration {
            buffer_size: Some(1024),
            timeout: Some(self.timeout),
            crt_bundle_attach: if self.url.starts_with("https") {
                Some(esp_crt_bundle_attach)
            } else {
                None
            },
            ..Default::default()
        })
        .map_err(|e| SyncError::Connection(e.to_string()))?;

        Ok(HttpClient::wrap(connection))
    }
}

fn classify(e: EspIOError, timeout: Duration) -> SyncError {
    let code = e.0.code();
    if code == ESP_ERR_HTTP_EAGAIN as esp_err_t || code == ESP_ERR_TIMEOUT as esp_err_t {
        SyncError::Timeout(timeout)
    } else {
        SyncError::Connection(e.to_string())
    }
}
