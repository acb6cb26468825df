// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provides an HTTP(S) [`Transport`] over a blocking `reqwest` client.
//! Retry and backoff policy is left to the caller; a fetch makes exactly one
//! request.

use crate::transport::{Transport, TransportError, TransportErrorKind};
use reqwest::blocking::ClientBuilder;
use reqwest::StatusCode;
use std::io::Read;
use std::time::Duration;
use url::Url;

/// A [`Transport`] over HTTP and HTTPS.
///
/// HTTP status 404 and 403 are reported as
/// [`TransportErrorKind::FileNotFound`]; repositories behind object stores
/// commonly answer 403 for absent keys, and the root-rotation walk treats
/// both as "no newer version".
#[derive(Debug, Clone, Copy)]
pub struct HttpTransport {
    /// Timeout for the complete request/response exchange.
    pub timeout: Duration,
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: Url) -> Result<Box<dyn Read + Send>, TransportError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TransportError::unsupported_scheme(url));
        }

        let client = ClientBuilder::new()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, &url, e))?;

        let response = client
            .get(url.clone())
            .send()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, &url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            return Err(TransportError::new(
                TransportErrorKind::FileNotFound,
                &url,
                format!("HTTP status {}", status),
            ));
        }
        if !status.is_success() {
            return Err(TransportError::new(
                TransportErrorKind::Other,
                &url,
                format!("HTTP status {}", status),
            ));
        }
        Ok(Box::new(response))
    }
}
