use std::fmt;
use url::Url;
use uuid::Uuid;

/// Host whose record pages carry a PMID as their first path segment.
pub const RECORD_HOST: &str = "pubmed.ncbi.nlm.nih.gov";

/// Numeric PubMed identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err("PMID cannot be empty".to_string());
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Invalid PMID '{trimmed}': expected digits only"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Extracts the record identifier from a record page address.
    ///
    /// Bare identifiers are accepted as well, so `12345` and
    /// `https://pubmed.ncbi.nlm.nih.gov/12345/` resolve to the same record.
    pub fn from_page(page: &str) -> Option<Self> {
        let page = page.trim();
        if let Ok(id) = Self::parse(page) {
            return Some(id);
        }

        let url = Url::parse(page)
            .or_else(|_| Url::parse(&format!("https://{page}")))
            .ok()?;
        if url.host_str()? != RECORD_HOST {
            return None;
        }

        let segment = url.path_segments()?.find(|s| !s.is_empty())?;
        Self::parse(segment).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user-triggered export, alive for a single orchestration call.
#[derive(Debug, Clone)]
pub struct RecordRequest {
    pub record_id: RecordId,
    pub identity: String,
    pub request_id: Uuid,
}

impl RecordRequest {
    pub fn new(record_id: RecordId, identity: impl Into<String>) -> Self {
        Self {
            record_id,
            identity: identity.into(),
            request_id: Uuid::new_v4(),
        }
    }
}
