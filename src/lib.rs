pub mod config;
pub mod feedback;
pub mod fetch;
pub mod host;
pub mod orchestrator;
pub mod outcome;
pub mod record;
pub mod relay;
pub mod trigger;
pub mod utils;

#[cfg(test)]
mod testutils;

use std::sync::Arc;

use config::Config;
use fetch::{EutilsClient, FetchError};
use orchestrator::{ConfigurationSurface, RequestOrchestrator};
use relay::{ProcessChannel, RelayClient};

/// Wires the production fetch client and helper channel from `config`.
pub fn build_orchestrator(
    config: &Config,
    ui: Arc<dyn ConfigurationSurface>,
) -> Result<RequestOrchestrator, FetchError> {
    let source = EutilsClient::new(&config.pubmed.base_url, config.pubmed.timeout())?;
    let channel = ProcessChannel::from_config(&config.helper);
    let relay = RelayClient::new(Arc::new(channel), config.helper.timeout());
    Ok(RequestOrchestrator::new(Arc::new(source), relay, ui))
}
