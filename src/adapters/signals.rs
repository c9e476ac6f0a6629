use crate::adapters::into_source_result;
use crate::domain::model::{Domain, SourceId, SourcePayload, SourceResult};
use crate::domain::payload::{Quote, SignalsData};
use crate::domain::ports::{EnrichOptions, QueryExecutor, SourceAdapter};
use crate::utils::error::{EnrichError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

const MAX_QUOTES: usize = 10;
const MIN_QUOTE_CHARS: usize = 20;
const MAX_QUOTE_CHARS: usize = 400;

/// 策略主題與其關鍵字
pub const STRATEGIC_THEMES: &[(&str, &[&str])] = &[
    ("search", &["search", "discovery", "findability"]),
    ("personalization", &["personalization", "personalisation", "recommendation"]),
    ("digital_transformation", &["digital transformation", "modernization", "replatform"]),
    ("ecommerce_growth", &["ecommerce", "e-commerce", "online sales", "digital sales", "conversion"]),
    ("customer_experience", &["customer experience", "user experience", "cx "]),
];

static SENTENCE_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+\s+|\n+").unwrap());

/// 從外部文字查詢結果中萃取策略主題與引述
///
/// Retrieval is delegated to the injected [`QueryExecutor`]; this adapter only
/// builds the query and parses the returned text.
#[derive(Clone)]
pub struct SignalsAdapter {
    executor: Option<Arc<dyn QueryExecutor>>,
    timeout: Duration,
}

impl SignalsAdapter {
    pub fn new(executor: Option<Arc<dyn QueryExecutor>>) -> Self {
        Self {
            executor,
            timeout: SourceId::Signals.default_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self, domain: &Domain, options: &EnrichOptions) -> Result<SignalsData> {
        let executor = self.executor.as_ref().ok_or_else(|| EnrichError::MissingConfig {
            field: "signals.query_executor".to_string(),
        })?;

        let query = build_query(domain, options.company_name.as_deref());
        let text = tokio::time::timeout(self.timeout, executor.execute(&query))
            .await
            .map_err(|_| EnrichError::Query {
                message: format!("query timed out after {:?}", self.timeout),
            })??;

        Ok(parse_signals(query, &text))
    }
}

#[async_trait]
impl SourceAdapter for SignalsAdapter {
    fn id(&self) -> SourceId {
        SourceId::Signals
    }

    fn is_available(&self) -> bool {
        self.executor.is_some()
    }

    async fn enrich(&self, domain: &Domain, options: &EnrichOptions) -> SourceResult {
        let outcome = self.fetch(domain, options).await.map(SourcePayload::Signals);
        into_source_result(SourceId::Signals, domain, outcome)
    }

    fn cache_hint(&self, options: &EnrichOptions) -> Option<String> {
        options
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

pub fn build_query(domain: &Domain, company_name: Option<&str>) -> String {
    let name = company_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            domain
                .as_str()
                .split('.')
                .next()
                .unwrap_or_default()
                .to_string()
        });

    format!(
        "\"{}\" (earnings call OR investor day OR annual report OR shareholder letter) \
         (search OR personalization OR \"digital transformation\" OR ecommerce OR \"customer experience\")",
        name
    )
}

pub fn parse_signals(query: String, text: &str) -> SignalsData {
    let mut quotes = Vec::new();
    let mut themes: Vec<String> = Vec::new();
    let mut seen = HashSet::new();

    for sentence in SENTENCE_SPLIT.split(text) {
        let sentence = sentence.trim().trim_matches('"').trim();
        let length = sentence.chars().count();
        if !(MIN_QUOTE_CHARS..=MAX_QUOTE_CHARS).contains(&length) {
            continue;
        }

        let lowered = format!("{} ", sentence.to_lowercase());
        let Some((theme, _)) = STRATEGIC_THEMES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        else {
            continue;
        };

        if !themes.iter().any(|t| t == theme) {
            themes.push(theme.to_string());
        }
        if quotes.len() < MAX_QUOTES && seen.insert(lowered) {
            quotes.push(Quote {
                text: sentence.to_string(),
                theme: theme.to_string(),
            });
        }
    }

    SignalsData {
        query,
        quotes,
        themes,
    }
}
