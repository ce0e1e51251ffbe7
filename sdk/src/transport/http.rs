//! reqwest-backed [`Transport`].
//!
//! One pooled client serves plain requests. Mutual-TLS requests build a
//! client around the supplied identity, since reqwest fixes the identity at
//! client construction.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ClientIdentity, Method, Transport, TransportError};

/// Production transport over HTTPS (rustls).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// A transport without a request deadline.
    pub fn new() -> Result<Self, TransportError> {
        Self::build(None)
    }

    /// A transport whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let client = Self::builder(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn builder(timeout: Option<Duration>) -> reqwest::ClientBuilder {
        let builder = reqwest::Client::builder().use_rustls_tls();
        match timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        }
    }

    fn identity_client(&self, identity: &ClientIdentity) -> Result<reqwest::Client, TransportError> {
        // reqwest wants certificate and key in one PEM buffer.
        let mut bundle = Vec::with_capacity(identity.cert_pem.len() + identity.key_pem.len() + 1);
        bundle.extend_from_slice(&identity.cert_pem);
        bundle.push(b'\n');
        bundle.extend_from_slice(&identity.key_pem);
        let pem = reqwest::Identity::from_pem(&bundle)
            .map_err(|e| TransportError::Client(format!("client identity: {e}")))?;

        let mut builder = Self::builder(self.timeout).identity(pem);
        if let Some(root) = &identity.root_ca_pem {
            let cert = reqwest::Certificate::from_pem(root)
                .map_err(|e| TransportError::Client(format!("root CA: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))
    }

    async fn execute(
        client: &reqwest::Client,
        method: Method,
        url: &str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, TransportError> {
        debug!(%method, url, body_len = body.len(), "platform request");
        let request = match method {
            Method::Get => client.get(url),
            Method::Post => client.post(url).body(body),
        };
        let response = request.send().await.map_err(|e| TransportError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| TransportError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!(url, status = status.as_u16(), len = bytes.len(), "platform response");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method: Method, url: &str, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        Self::execute(&self.client, method, url, body).await
    }

    async fn send_with_identity(
        &self,
        method: Method,
        url: &str,
        body: Vec<u8>,
        identity: &ClientIdentity,
    ) -> Result<Vec<u8>, TransportError> {
        let client = self.identity_client(identity)?;
        Self::execute(&client, method, url, body).await
    }
}
