use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::outcome::FailureKind;
use crate::record::RecordId;

const EFETCH_PATH: &str = "entrez/eutils/efetch.fcgi";

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("PubMed API error: {0}")]
    Status(u16),
    #[error("No data found for PMID: {record_id}")]
    EmptyRecord { record_id: String },
    #[error("PubMed request failed: {0}")]
    Network(String),
    #[error("PubMed request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("Invalid PubMed endpoint '{0}'")]
    InvalidEndpoint(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::EmptyRecord { .. } => FailureKind::EmptyRecord,
            FetchError::Status(_)
            | FetchError::Network(_)
            | FetchError::Timeout(_)
            | FetchError::InvalidEndpoint(_) => FailureKind::Transport,
        }
    }
}

/// Retrieves raw MEDLINE text for a record.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, record_id: &RecordId, identity: &str) -> Result<String, FetchError>;
}

/// E-utilities `efetch` client. One attempt per call, no retries.
#[derive(Clone)]
pub struct EutilsClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl EutilsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let endpoint = format!("{}/{}", base_url.trim_end_matches('/'), EFETCH_PATH);
        let endpoint =
            Url::parse(&endpoint).map_err(|_| FetchError::InvalidEndpoint(base_url.to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// Full request URL for a record; the identity is percent-encoded.
    pub fn record_url(&self, record_id: &RecordId, identity: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("id", record_id.as_str())
            .append_pair("rettype", "medline")
            .append_pair("retmode", "text")
            .append_pair("email", identity);
        url
    }

    fn map_request_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl RecordSource for EutilsClient {
    async fn fetch(&self, record_id: &RecordId, identity: &str) -> Result<String, FetchError> {
        let url = self.record_url(record_id, identity);
        info!(record_id = %record_id, "Fetching record from PubMed");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                record_id = %record_id,
                status = status.as_u16(),
                "PubMed returned an error status"
            );
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if body.trim().is_empty() {
            warn!(record_id = %record_id, "PubMed returned an empty record");
            return Err(FetchError::EmptyRecord {
                record_id: record_id.to_string(),
            });
        }

        debug!(record_id = %record_id, bytes = body.len(), "Fetched record");
        Ok(body)
    }
}
