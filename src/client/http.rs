//! HTTP transport for the research backend.

use async_trait::async_trait;
use futures_util::stream::Stream;
use reqwest::Client;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{ResearchBackend, ResearchRequest};
use crate::config::{DecoderConfig, ServerConfig};
use crate::models::ResearchEvent;
use crate::stream::{decode_stream_with, event_stream, DecodeStats, DecoderOptions, StreamError};

/// Boxed stream of decoded events from one research session
pub type ResearchEventStream =
    Pin<Box<dyn Stream<Item = Result<ResearchEvent, StreamError>> + Send>>;

/// Client for the research server's streaming endpoint
#[derive(Debug, Clone)]
pub struct ResearchClient {
    client: Arc<Client>,
    endpoint: Url,
    options: DecoderOptions,
}

impl ResearchClient {
    /// Create a client for `base_url` using the default endpoint and timeouts
    pub fn new(base_url: &str) -> Result<Self, StreamError> {
        Self::from_config(
            &ServerConfig {
                base_url: base_url.to_string(),
                ..ServerConfig::default()
            },
            &DecoderConfig::default(),
        )
    }

    /// Create a client from configuration
    pub fn from_config(server: &ServerConfig, decoder: &DecoderConfig) -> Result<Self, StreamError> {
        let mut builder = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(server.connect_timeout_secs));
        if server.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(server.timeout_secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client: Arc::new(client),
            endpoint: endpoint_url(&server.base_url, &server.endpoint)?,
            options: DecoderOptions::default().strict_results(decoder.strict_results),
        })
    }

    /// Create from an existing reqwest Client
    pub fn with_client(client: Arc<Client>, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            options: DecoderOptions::default(),
        }
    }

    /// Override the decoder options
    pub fn with_decoder_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    /// Full URL research requests are posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn open(&self, idea: &str) -> Result<reqwest::Response, StreamError> {
        let request = ResearchRequest::new(idea)?;
        info!("Submitting research idea to {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown status").to_string(),
            });
        }
        debug!("Research stream opened ({})", status);
        Ok(response)
    }

    /// Submit `idea` and return the decoded events as a lazy stream
    pub async fn research_events(&self, idea: &str) -> Result<ResearchEventStream, StreamError> {
        let response = self.open(idea).await?;
        Ok(Box::pin(event_stream(
            Box::pin(response.bytes_stream()),
            self.options,
        )))
    }
}

#[async_trait]
impl ResearchBackend for ResearchClient {
    fn name(&self) -> &str {
        "HTTP research server"
    }

    async fn research(
        &self,
        idea: &str,
        sink: &mut (dyn FnMut(ResearchEvent) + Send),
    ) -> Result<DecodeStats, StreamError> {
        let response = self.open(idea).await?;
        decode_stream_with(response.bytes_stream(), self.options, sink).await
    }
}

/// Join the configured base URL and endpoint path.
///
/// The base is treated as a directory, so `http://host/prefix` and
/// `http://host/prefix/` both resolve `api/research` under `/prefix/`.
pub fn endpoint_url(base_url: &str, endpoint: &str) -> Result<Url, StreamError> {
    let mut base = Url::parse(base_url.trim())
        .map_err(|e| StreamError::InvalidRequest(format!("invalid server URL '{}': {}", base_url, e)))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(endpoint.trim_start_matches('/'))
        .map_err(|e| StreamError::InvalidRequest(format!("invalid endpoint '{}': {}", endpoint, e)))
}
