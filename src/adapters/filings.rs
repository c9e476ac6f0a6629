use crate::adapters::http::{endpoint, fetch_required_json};
use crate::adapters::{into_source_result, require_credential};
use crate::config::ProviderConfig;
use crate::domain::model::{Domain, SourceId, SourcePayload, SourceResult};
use crate::domain::payload::{Filing, FilingsData};
use crate::domain::ports::{EnrichOptions, SourceAdapter};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

const MAX_FILINGS: usize = 20;
const ANNUAL_FORMS: &[&str] = &["10-K", "20-F", "40-F"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilingsResponse {
    #[serde(default)]
    cik: Option<String>,
    #[serde(default)]
    entity_name: Option<String>,
    #[serde(default)]
    filings: Vec<FilingEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilingEntry {
    form: String,
    #[serde(default)]
    filing_date: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// 公開申報文件 metadata
///
/// The filings provider identifies callers by a contact string sent as the
/// `User-Agent`; that contact is the credential for this source.
#[derive(Debug, Clone)]
pub struct FilingsAdapter {
    client: Client,
    config: ProviderConfig,
}

impl FilingsAdapter {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    async fn fetch(&self, domain: &Domain, options: &EnrichOptions) -> Result<FilingsData> {
        let contact = require_credential(SourceId::Filings, &self.config)?;
        let query = lookup_term(domain, options);

        let url = endpoint(&self.config.base_url, "/api/filings");
        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, contact)
            .query(&[("q", query.as_str())]);

        let response: FilingsResponse = fetch_required_json(
            SourceId::Filings,
            request,
            self.config.timeout(SourceId::Filings),
        )
        .await?;

        Ok(summarize(response))
    }
}

#[async_trait]
impl SourceAdapter for FilingsAdapter {
    fn id(&self) -> SourceId {
        SourceId::Filings
    }

    fn is_available(&self) -> bool {
        self.config.credential().is_some()
    }

    async fn enrich(&self, domain: &Domain, options: &EnrichOptions) -> SourceResult {
        let outcome = self.fetch(domain, options).await.map(SourcePayload::Filings);
        into_source_result(SourceId::Filings, domain, outcome)
    }

    fn cache_hint(&self, options: &EnrichOptions) -> Option<String> {
        hinted_term(options).map(str::to_string)
    }
}

/// 查詢詞優先順序：ticker → 公司名稱 → 網域
fn lookup_term(domain: &Domain, options: &EnrichOptions) -> String {
    hinted_term(options)
        .unwrap_or_else(|| domain.as_str())
        .to_string()
}

fn hinted_term(options: &EnrichOptions) -> Option<&str> {
    options
        .ticker
        .as_deref()
        .or(options.company_name.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn summarize(response: FilingsResponse) -> FilingsData {
    let mut filings: Vec<Filing> = response
        .filings
        .into_iter()
        .map(|f| Filing {
            form: f.form.trim().to_uppercase(),
            filed_at: f
                .filing_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            url: f.url,
        })
        .collect();
    filings.sort_by(|a, b| b.filed_at.cmp(&a.filed_at));
    filings.truncate(MAX_FILINGS);

    let latest_annual_report = filings
        .iter()
        .filter(|f| ANNUAL_FORMS.contains(&f.form.as_str()))
        .filter_map(|f| f.filed_at)
        .max();

    FilingsData {
        cik: response.cik,
        company_name: response.entity_name,
        filings,
        latest_annual_report,
    }
}
