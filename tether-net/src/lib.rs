use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Url};
use tether_core::{NetworkReply, NetworkRequest, Transport};
use thiserror::Error;
use tracing::{debug, warn};

pub mod body;

pub use body::{BodyEncoding, user_defined_bytes};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Performs network calls for the bridge over HTTP.
/// POST sends the form fields as multipart; every other method sends no body.
pub struct HttpTransport {
    http: Client,
    encoding: BodyEncoding,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl HttpTransport {
    /// A client with its own cookie store, so credentialed calls carry cookies
    /// between requests.
    pub fn new(encoding: BodyEncoding) -> Result<Self, TransportError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(http, encoding))
    }

    pub fn with_client(http: Client, encoding: BodyEncoding) -> Self {
        Self { http, encoding }
    }

    pub fn encoding(&self) -> BodyEncoding {
        self.encoding
    }

    /// Build the outgoing request without sending it.
    pub fn prepare(&self, request: &NetworkRequest) -> Result<RequestBuilder, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::InvalidMethod(request.method.clone()))?;
        let url = Url::parse(&request.url).map_err(|e| TransportError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let builder = self.http.request(method, url);
        if !request.has_body() {
            return Ok(builder);
        }

        let form = request
            .values()
            .into_iter()
            .fold(Form::new(), |form, (key, value)| {
                form.text(key.to_string(), value.to_string())
            });
        Ok(builder.multipart(form))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<NetworkReply, TransportError> {
        let resp = builder.send().await?;
        let status = i32::from(resp.status().as_u16());
        let bytes = resp.bytes().await?;
        Ok(NetworkReply::new(status, self.encoding.decode(&bytes)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &NetworkRequest) -> NetworkReply {
        let builder = match self.prepare(request) {
            Ok(builder) => builder,
            Err(e) => {
                warn!(method = %request.method, url = %request.url, "network call rejected: {}", e);
                return NetworkReply::unreachable();
            }
        };

        match self.execute(builder).await {
            Ok(reply) => {
                debug!(
                    url = %request.url,
                    status = reply.status,
                    bytes = reply.body.len(),
                    "network call finished"
                );
                reply
            }
            Err(e) => {
                warn!(url = %request.url, "network call failed: {}", e);
                NetworkReply::new(NetworkReply::TRANSPORT_FAILURE, String::new())
            }
        }
    }
}
