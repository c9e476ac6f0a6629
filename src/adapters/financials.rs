use crate::adapters::http::{endpoint, fetch_json};
use crate::adapters::{into_source_result, require_credential};
use crate::config::ProviderConfig;
use crate::domain::model::{Domain, SourceId, SourcePayload, SourceResult};
use crate::domain::payload::{
    AnalystSentiment, FinancialData, FinancialOutcome, FinancialSummary, YearlyFinancials,
};
use crate::domain::ports::{EnrichOptions, SourceAdapter};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const MAX_HISTORY_YEARS: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSummary {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    revenue: Option<f64>,
    #[serde(default)]
    gross_margin: Option<f64>,
    #[serde(default)]
    operating_margin: Option<f64>,
    #[serde(default)]
    net_margin: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
    #[serde(default)]
    analyst: Option<AnalystEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry {
    year: i32,
    #[serde(default)]
    revenue: Option<f64>,
    #[serde(default)]
    net_income: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalystEntry {
    #[serde(default)]
    consensus: Option<String>,
    #[serde(default)]
    target_price: Option<f64>,
    #[serde(default)]
    analyst_count: Option<u32>,
}

/// 上市公司財務摘要，需要 ticker
#[derive(Debug, Clone)]
pub struct FinancialsAdapter {
    client: Client,
    config: ProviderConfig,
}

impl FinancialsAdapter {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    async fn fetch(&self, options: &EnrichOptions) -> Result<FinancialData> {
        let api_key = require_credential(SourceId::Financials, &self.config)?;

        // 沒有 ticker 就不是可查詢的上市公司，不發請求
        let Some(ticker) = normalize_ticker(options.ticker.as_deref()) else {
            return Ok(FinancialData {
                ticker: None,
                outcome: FinancialOutcome::NotPublic,
            });
        };

        let url = endpoint(
            &self.config.base_url,
            &format!("/api/v3/profile-summary/{}", ticker),
        );
        let request = self.client.get(url).query(&[("apikey", api_key)]);
        let summary: Option<ProfileSummary> = fetch_json(
            SourceId::Financials,
            request,
            self.config.timeout(SourceId::Financials),
        )
        .await?;

        let outcome = match summary {
            Some(summary) if summary.symbol.is_some() => {
                FinancialOutcome::Public(summarize(summary))
            }
            _ => FinancialOutcome::NotPublic,
        };

        Ok(FinancialData {
            ticker: Some(ticker),
            outcome,
        })
    }
}

#[async_trait]
impl SourceAdapter for FinancialsAdapter {
    fn id(&self) -> SourceId {
        SourceId::Financials
    }

    fn is_available(&self) -> bool {
        self.config.credential().is_some()
    }

    async fn enrich(&self, domain: &Domain, options: &EnrichOptions) -> SourceResult {
        let outcome = self.fetch(options).await.map(SourcePayload::Financials);
        into_source_result(SourceId::Financials, domain, outcome)
    }

    fn cache_hint(&self, options: &EnrichOptions) -> Option<String> {
        normalize_ticker(options.ticker.as_deref())
    }

    /// 沒有 ticker 的「非上市」沒有真的查過，不寫入快取
    fn is_cacheable(&self, result: &SourceResult, options: &EnrichOptions) -> bool {
        result.success && self.cache_hint(options).is_some()
    }
}

fn normalize_ticker(raw: Option<&str>) -> Option<String> {
    raw.map(|t| t.trim().trim_start_matches('$').to_uppercase())
        .filter(|t| {
            !t.is_empty()
                && t.len() <= 10
                && t.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        })
}

fn summarize(summary: ProfileSummary) -> FinancialSummary {
    let mut history: Vec<YearlyFinancials> = summary
        .history
        .into_iter()
        .map(|h| YearlyFinancials {
            year: h.year,
            revenue: h.revenue,
            net_income: h.net_income,
        })
        .collect();
    history.sort_by(|a, b| b.year.cmp(&a.year));
    history.dedup_by_key(|h| h.year);
    history.truncate(MAX_HISTORY_YEARS);

    let revenue = summary
        .revenue
        .or_else(|| history.first().and_then(|h| h.revenue));

    FinancialSummary {
        revenue,
        gross_margin: summary.gross_margin,
        operating_margin: summary.operating_margin,
        net_margin: summary.net_margin,
        market_cap: summary.market_cap,
        history,
        analyst: summary.analyst.map(|a| AnalystSentiment {
            rating: a.consensus.map(|c| c.to_lowercase()),
            target_price: a.target_price,
            analyst_count: a.analyst_count,
        }),
    }
}
