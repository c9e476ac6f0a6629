// Adapters layer: concrete implementations for external systems (providers, storage, http).

pub mod filings;
pub mod financials;
pub mod hiring;
pub mod http;
pub mod signals;
pub mod storage;
pub mod techstack;
pub mod traffic;

pub use filings::FilingsAdapter;
pub use financials::FinancialsAdapter;
pub use hiring::HiringAdapter;
pub use signals::SignalsAdapter;
pub use storage::LocalSink;
pub use techstack::{PartnerMatcher, TechStackAdapter};
pub use traffic::TrafficAdapter;

use crate::config::ProviderConfig;
use crate::domain::model::{Domain, SourceId, SourcePayload, SourceResult};
use crate::utils::error::{EnrichError, Result};

pub(crate) fn require_credential(source: SourceId, config: &ProviderConfig) -> Result<&str> {
    config.credential().ok_or_else(|| EnrichError::MissingConfig {
        field: format!("providers.{}.api_key", source),
    })
}

/// adapter 邊界：錯誤一律轉成失敗結果，不往外傳
pub(crate) fn into_source_result(
    source: SourceId,
    domain: &Domain,
    outcome: Result<SourcePayload>,
) -> SourceResult {
    match outcome {
        Ok(payload) => SourceResult::success(payload),
        Err(e) => {
            tracing::warn!(domain = %domain, source = %source, error = %e, "source fetch failed");
            SourceResult::failure(source, e.to_string())
        }
    }
}
