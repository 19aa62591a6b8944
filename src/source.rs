use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::InstallError;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Where the vehicle XML text comes from.
pub trait XmlSource: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, InstallError>;
}

#[derive(Clone)]
pub struct HttpXmlSource {
    client: Client,
}

impl HttpXmlSource {
    pub fn new() -> Result<Self, InstallError> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, InstallError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("sw-install/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| InstallError::FetchTransport(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| InstallError::FetchTransport(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, InstallError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .status()
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
        Err(InstallError::FetchStatus { status, message })
    }
}

impl XmlSource for HttpXmlSource {
    fn fetch_text(&self, url: &str) -> Result<String, InstallError> {
        let response = self.client.get(url).send().map_err(map_transport)?;
        let response = Self::handle_status(response)?;
        response.text().map_err(map_transport)
    }
}

fn map_transport(err: reqwest::Error) -> InstallError {
    if err.is_timeout() {
        InstallError::FetchTimeout
    } else {
        InstallError::FetchTransport(err.to_string())
    }
}
