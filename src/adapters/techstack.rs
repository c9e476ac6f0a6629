use crate::adapters::http::{endpoint, fetch_required_json};
use crate::adapters::{into_source_result, require_credential};
use crate::config::ProviderConfig;
use crate::domain::model::{Domain, SourceId, SourcePayload, SourceResult};
use crate::domain::payload::{TechStackData, Technology};
use crate::domain::ports::{EnrichOptions, SourceAdapter};
use crate::utils::error::{EnrichError, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

pub const DEFAULT_PARTNER_TECHNOLOGIES: &[&str] = &[
    "Adobe Experience Manager",
    "Salesforce Commerce Cloud",
    "Shopify Plus",
    "BigCommerce",
    "commercetools",
    "Contentful",
    "SAP Commerce Cloud",
    "Magento",
];

type Rule = (&'static str, Regex);

fn rules(patterns: &[(&'static str, &str)]) -> Vec<Rule> {
    patterns
        .iter()
        .filter_map(|(label, pattern)| Regex::new(pattern).ok().map(|re| (*label, re)))
        .collect()
}

static CMS_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("Adobe Experience Manager", r"(?i)adobe experience manager|\baem\b"),
        ("Sitecore", r"(?i)\bsitecore\b"),
        ("Contentful", r"(?i)\bcontentful\b"),
        ("Drupal", r"(?i)\bdrupal\b"),
        ("WordPress", r"(?i)\bwordpress\b"),
        ("Contentstack", r"(?i)\bcontentstack\b"),
    ])
});

static ECOMMERCE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("Salesforce Commerce Cloud", r"(?i)salesforce commerce cloud|demandware"),
        ("Shopify Plus", r"(?i)shopify plus"),
        ("Shopify", r"(?i)\bshopify\b"),
        ("Adobe Commerce", r"(?i)\bmagento\b|adobe commerce"),
        ("SAP Commerce Cloud", r"(?i)sap commerce|\bhybris\b"),
        ("BigCommerce", r"(?i)\bbigcommerce\b"),
        ("commercetools", r"(?i)\bcommercetools\b"),
        ("WooCommerce", r"(?i)\bwoocommerce\b"),
    ])
});

static SEARCH_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("Algolia", r"(?i)\balgolia\b"),
        ("Coveo", r"(?i)\bcoveo\b"),
        ("Bloomreach", r"(?i)\bbloomreach\b"),
        ("Constructor", r"(?i)constructor\.io|\bconstructor\b"),
        ("Searchspring", r"(?i)\bsearchspring\b"),
        ("Klevu", r"(?i)\bklevu\b"),
        ("Lucidworks", r"(?i)\blucidworks\b|\bfusion search\b"),
        ("Yext", r"(?i)\byext\b"),
        ("Elasticsearch", r"(?i)\belastic(search)?\b"),
        ("Solr", r"(?i)\bsolr\b"),
    ])
});

static ANALYTICS_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("Google Analytics", r"(?i)google analytics|\bga4\b"),
        ("Google Tag Manager", r"(?i)google tag manager"),
        ("Adobe Analytics", r"(?i)adobe analytics|omniture"),
        ("Segment", r"(?i)\bsegment\b"),
        ("Amplitude", r"(?i)\bamplitude\b"),
        ("Mixpanel", r"(?i)\bmixpanel\b"),
        ("Heap", r"(?i)\bheap\b"),
        ("Hotjar", r"(?i)\bhotjar\b"),
    ])
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupResult>,
    #[serde(default)]
    errors: Vec<LookupError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LookupResult {
    result: LookupPaths,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LookupPaths {
    #[serde(default)]
    paths: Vec<LookupPath>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LookupPath {
    #[serde(default)]
    technologies: Vec<LookupTechnology>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LookupTechnology {
    name: String,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LookupError {
    message: String,
}

/// 合作夥伴技術比對規則
#[derive(Debug, Clone)]
pub struct PartnerMatcher {
    patterns: Arc<Vec<(String, Regex)>>,
}

impl PartnerMatcher {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let patterns = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref().trim();
                let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
                Regex::new(&pattern).ok().map(|re| (name.to_string(), re))
            })
            .collect();
        Self {
            patterns: Arc::new(patterns),
        }
    }

    pub fn matches(&self, technologies: &[Technology]) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|(_, re)| technologies.iter().any(|t| re.is_match(&t.name)))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Default for PartnerMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PARTNER_TECHNOLOGIES)
    }
}

/// 網站技術指紋
#[derive(Debug, Clone)]
pub struct TechStackAdapter {
    client: Client,
    config: ProviderConfig,
    partners: PartnerMatcher,
}

impl TechStackAdapter {
    pub fn new(client: Client, config: ProviderConfig, partners: PartnerMatcher) -> Self {
        Self {
            client,
            config,
            partners,
        }
    }

    async fn fetch(&self, domain: &Domain) -> Result<TechStackData> {
        let api_key = require_credential(SourceId::TechStack, &self.config)?;
        let url = endpoint(&self.config.base_url, "/v21/api.json");
        let request = self
            .client
            .get(url)
            .query(&[("KEY", api_key), ("LOOKUP", domain.as_str())]);

        let response: LookupResponse = fetch_required_json(
            SourceId::TechStack,
            request,
            self.config.timeout(SourceId::TechStack),
        )
        .await?;

        if let Some(error) = response.errors.first() {
            return Err(EnrichError::Provider {
                source_id: SourceId::TechStack.to_string(),
                message: error.message.clone(),
            });
        }

        Ok(self.fingerprint(response))
    }

    fn fingerprint(&self, response: LookupResponse) -> TechStackData {
        let mut seen = HashSet::new();
        let technologies: Vec<Technology> = response
            .results
            .into_iter()
            .flat_map(|r| r.result.paths)
            .flat_map(|p| p.technologies)
            .filter(|t| seen.insert(t.name.to_lowercase()))
            .map(|t| Technology {
                category: t.categories.into_iter().next().or(t.tag),
                name: t.name,
            })
            .collect();

        TechStackData {
            partner_technologies: self.partners.matches(&technologies),
            cms: first_match(&CMS_RULES, &technologies),
            ecommerce_platform: first_match(&ECOMMERCE_RULES, &technologies),
            search_provider: first_match(&SEARCH_RULES, &technologies),
            analytics_tags: all_matches(&ANALYTICS_RULES, &technologies),
            technologies,
        }
    }
}

#[async_trait]
impl SourceAdapter for TechStackAdapter {
    fn id(&self) -> SourceId {
        SourceId::TechStack
    }

    fn is_available(&self) -> bool {
        self.config.credential().is_some()
    }

    async fn enrich(&self, domain: &Domain, _options: &EnrichOptions) -> SourceResult {
        let outcome = self.fetch(domain).await.map(SourcePayload::TechStack);
        into_source_result(SourceId::TechStack, domain, outcome)
    }
}

/// 規則依優先順序排列，取第一個命中的
fn first_match(rules: &[Rule], technologies: &[Technology]) -> Option<String> {
    rules
        .iter()
        .find(|(_, re)| technologies.iter().any(|t| re.is_match(&t.name)))
        .map(|(label, _)| label.to_string())
}

fn all_matches(rules: &[Rule], technologies: &[Technology]) -> Vec<String> {
    rules
        .iter()
        .filter(|(_, re)| technologies.iter().any(|t| re.is_match(&t.name)))
        .map(|(label, _)| label.to_string())
        .collect()
}
