use super::ConfigurationError;
use std::time::Duration;

/// Settings handed through to the HTTP transport.
///
/// Every `with_*` method returns a new value; the receiver is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpClientOptions {
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    timeout: Option<Duration>,
    proxy: Option<String>,
}

impl HttpClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn with_connect_timeout(&self, value: Duration) -> Self {
        Self {
            connect_timeout: Some(value),
            ..self.clone()
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn with_read_timeout(&self, value: Duration) -> Self {
        Self {
            read_timeout: Some(value),
            ..self.clone()
        }
    }

    /// Total time allowed for a request, connect to last body byte.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn with_timeout(&self, value: Duration) -> Self {
        Self {
            timeout: Some(value),
            ..self.clone()
        }
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn with_proxy(&self, value: impl Into<String>) -> Self {
        Self {
            proxy: Some(value.into()),
            ..self.clone()
        }
    }

    pub fn build_client(&self) -> Result<reqwest::Client, ConfigurationError> {
        let mut builder = reqwest::Client::builder();

        if let Some(value) = self.connect_timeout {
            builder = builder.connect_timeout(value);
        }
        if let Some(value) = self.read_timeout {
            builder = builder.read_timeout(value);
        }
        if let Some(value) = self.timeout {
            builder = builder.timeout(value);
        }
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        Ok(builder.build()?)
    }
}
