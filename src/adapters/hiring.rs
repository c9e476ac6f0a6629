use crate::adapters::http::{endpoint, fetch_required_json};
use crate::adapters::{into_source_result, require_credential};
use crate::config::ProviderConfig;
use crate::domain::model::{Domain, SourceId, SourcePayload, SourceResult};
use crate::domain::payload::{HiringData, SeniorityTiers};
use crate::domain::ports::{EnrichOptions, SourceAdapter};
use crate::utils::error::Result;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

const MAX_RELEVANT_ROLES: usize = 10;

pub const HIRING_KEYWORDS: &[&str] = &[
    "search",
    "ecommerce",
    "personalization",
    "merchandising",
    "discovery",
    "relevance",
    "digital",
    "machine learning",
];

static EXECUTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(chief|ceo|cto|cio|cmo|cdo|coo|vp|svp|evp|vice president|head of|president)\b")
        .unwrap()
});
static DIRECTOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bdirector\b").unwrap());
static MANAGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(manager|lead|principal)\b").unwrap());

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    total: Option<u32>,
    #[serde(default)]
    jobs: Vec<JobPosting>,
}

#[derive(Debug, Deserialize)]
struct JobPosting {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeniorityTier {
    Executive,
    Director,
    Manager,
    Individual,
}

pub fn classify_title(title: &str) -> SeniorityTier {
    if EXECUTIVE_RE.is_match(title) {
        SeniorityTier::Executive
    } else if DIRECTOR_RE.is_match(title) {
        SeniorityTier::Director
    } else if MANAGER_RE.is_match(title) {
        SeniorityTier::Manager
    } else {
        SeniorityTier::Individual
    }
}

/// 職缺訊號：依職級統計並計算關鍵字命中
#[derive(Debug, Clone)]
pub struct HiringAdapter {
    client: Client,
    config: ProviderConfig,
}

impl HiringAdapter {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    async fn fetch(&self, domain: &Domain) -> Result<HiringData> {
        let api_key = require_credential(SourceId::Hiring, &self.config)?;
        let url = endpoint(&self.config.base_url, "/v1/jobs");
        let request = self
            .client
            .get(url)
            .bearer_auth(api_key)
            .query(&[("domain", domain.as_str())]);

        let response: JobsResponse = fetch_required_json(
            SourceId::Hiring,
            request,
            self.config.timeout(SourceId::Hiring),
        )
        .await?;

        Ok(summarize(response))
    }
}

#[async_trait]
impl SourceAdapter for HiringAdapter {
    fn id(&self) -> SourceId {
        SourceId::Hiring
    }

    fn is_available(&self) -> bool {
        self.config.credential().is_some()
    }

    async fn enrich(&self, domain: &Domain, _options: &EnrichOptions) -> SourceResult {
        let outcome = self.fetch(domain).await.map(SourcePayload::Hiring);
        into_source_result(SourceId::Hiring, domain, outcome)
    }
}

fn summarize(response: JobsResponse) -> HiringData {
    let mut tiers = SeniorityTiers::default();
    let mut keyword_hits: BTreeMap<String, u32> = BTreeMap::new();
    let mut relevant_roles = Vec::new();

    for job in &response.jobs {
        match classify_title(&job.title) {
            SeniorityTier::Executive => tiers.executive += 1,
            SeniorityTier::Director => tiers.director += 1,
            SeniorityTier::Manager => tiers.manager += 1,
            SeniorityTier::Individual => tiers.individual += 1,
        }

        let text = format!(
            "{} {}",
            job.title,
            job.description.as_deref().unwrap_or_default()
        )
        .to_lowercase();

        let mut relevant = false;
        for keyword in HIRING_KEYWORDS {
            if text.contains(keyword) {
                *keyword_hits.entry(keyword.to_string()).or_insert(0) += 1;
                relevant = true;
            }
        }
        if relevant && relevant_roles.len() < MAX_RELEVANT_ROLES {
            relevant_roles.push(job.title.clone());
        }
    }

    let listed = response.jobs.len() as u32;
    HiringData {
        total_openings: response.total.unwrap_or(listed).max(listed),
        tiers,
        keyword_hits,
        relevant_roles,
    }
}
