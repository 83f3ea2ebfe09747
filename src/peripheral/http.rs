use std::time::Duration;

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::{Client, StatusCode, Uri};

use super::channel::PeripheralLink;
use super::error::PeripheralError;
use super::photo::PhotoService;
use super::status::LinkHealth;

#[derive(Clone)]
struct HttpEndpoint {
    client: Client<HttpConnector>,
    base: String,
    timeout: Duration,
}

impl HttpEndpoint {
    fn new(base: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Bytes), PeripheralError> {
        let uri: Uri = format!("{}/{}", self.base, path).parse()?;
        let request = async {
            let response = self.client.get(uri).await?;
            let status = response.status();
            let body = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, PeripheralError>((status, body))
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| PeripheralError::Timeout(self.timeout))?
    }
}

/// Antenna switch reachable over HTTP: `GET <base>/<command>`, acknowledged by 200.
pub struct HttpAntennaLink {
    endpoint: HttpEndpoint,
}

impl HttpAntennaLink {
    pub fn new(base: &str, timeout: Duration) -> Self {
        Self {
            endpoint: HttpEndpoint::new(base, timeout),
        }
    }
}

#[async_trait]
impl PeripheralLink for HttpAntennaLink {
    async fn send(&self, command: &str) -> Result<(), PeripheralError> {
        let (status, _) = self.endpoint.get(command).await?;
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(PeripheralError::Status(status.as_u16()))
        }
    }

    async fn check(&self) -> LinkHealth {
        match self.endpoint.get("").await {
            Ok((status, _)) if status == StatusCode::OK => LinkHealth::Good,
            Ok((status, _)) => {
                log::debug!("Antenna status page returned {}", status);
                LinkHealth::Warning
            }
            Err(e) => {
                log::debug!("Antenna unreachable: {}", e);
                LinkHealth::Bad
            }
        }
    }
}

/// Phone-hosted camera service exposing `/take_photo` and `/ping`.
pub struct HttpPhotoService {
    photo: HttpEndpoint,
    ping: HttpEndpoint,
}

impl HttpPhotoService {
    pub fn new(base: &str, photo_timeout: Duration, ping_timeout: Duration) -> Self {
        Self {
            photo: HttpEndpoint::new(base, photo_timeout),
            ping: HttpEndpoint::new(base, ping_timeout),
        }
    }
}

#[async_trait]
impl PhotoService for HttpPhotoService {
    async fn take_photo(&self) -> Result<Vec<u8>, PeripheralError> {
        let (status, body) = self.photo.get("take_photo").await?;
        if status == StatusCode::OK {
            Ok(body.to_vec())
        } else {
            Err(PeripheralError::Status(status.as_u16()))
        }
    }

    async fn ping(&self) -> LinkHealth {
        match self.ping.get("ping").await {
            Ok((status, body))
                if status == StatusCode::OK
                    && String::from_utf8_lossy(&body).to_lowercase().contains("pong") =>
            {
                LinkHealth::Good
            }
            Ok(_) => LinkHealth::Warning,
            Err(_) => LinkHealth::Bad,
        }
    }
}
