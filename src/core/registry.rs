use crate::adapters::{
    http::build_client, FilingsAdapter, FinancialsAdapter, HiringAdapter, PartnerMatcher,
    SignalsAdapter, TechStackAdapter, TrafficAdapter,
};
use crate::config::EnrichConfig;
use crate::domain::model::{Domain, SourceId, SourceResult};
use crate::domain::ports::{EnrichOptions, QueryExecutor, SourceAdapter};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 所有已知來源的封閉集合
#[derive(Clone)]
pub enum Source {
    Traffic(TrafficAdapter),
    TechStack(TechStackAdapter),
    Financials(FinancialsAdapter),
    Filings(FilingsAdapter),
    Hiring(HiringAdapter),
    Signals(SignalsAdapter),
}

impl Source {
    fn adapter(&self) -> &dyn SourceAdapter {
        match self {
            Source::Traffic(a) => a,
            Source::TechStack(a) => a,
            Source::Financials(a) => a,
            Source::Filings(a) => a,
            Source::Hiring(a) => a,
            Source::Signals(a) => a,
        }
    }

    fn build(
        id: SourceId,
        client: &Client,
        config: &EnrichConfig,
        executor: Option<Arc<dyn QueryExecutor>>,
    ) -> Self {
        let providers = &config.providers;
        match id {
            SourceId::Traffic => {
                Source::Traffic(TrafficAdapter::new(client.clone(), providers.traffic.clone()))
            }
            SourceId::TechStack => {
                let partners = config
                    .scoring
                    .partner_technologies
                    .as_deref()
                    .map(PartnerMatcher::new)
                    .unwrap_or_default();
                Source::TechStack(TechStackAdapter::new(
                    client.clone(),
                    providers.techstack.clone(),
                    partners,
                ))
            }
            SourceId::Financials => Source::Financials(FinancialsAdapter::new(
                client.clone(),
                providers.financials.clone(),
            )),
            SourceId::Filings => {
                Source::Filings(FilingsAdapter::new(client.clone(), providers.filings.clone()))
            }
            SourceId::Hiring => {
                Source::Hiring(HiringAdapter::new(client.clone(), providers.hiring.clone()))
            }
            SourceId::Signals => Source::Signals(SignalsAdapter::new(executor)),
        }
    }
}

#[async_trait]
impl SourceAdapter for Source {
    fn id(&self) -> SourceId {
        self.adapter().id()
    }

    fn is_available(&self) -> bool {
        self.adapter().is_available()
    }

    async fn enrich(&self, domain: &Domain, options: &EnrichOptions) -> SourceResult {
        self.adapter().enrich(domain, options).await
    }

    fn cache_hint(&self, options: &EnrichOptions) -> Option<String> {
        self.adapter().cache_hint(options)
    }

    fn is_cacheable(&self, result: &SourceResult, options: &EnrichOptions) -> bool {
        self.adapter().is_cacheable(result, options)
    }
}

/// 來源 id → adapter 的固定對照表
#[derive(Clone)]
pub struct Registry {
    sources: BTreeMap<SourceId, Source>,
}

impl Registry {
    pub fn from_config(
        config: &EnrichConfig,
        executor: Option<Arc<dyn QueryExecutor>>,
    ) -> Result<Self> {
        let client = build_client()?;
        Ok(Self::with_client(&client, config, executor))
    }

    pub fn with_client(
        client: &Client,
        config: &EnrichConfig,
        executor: Option<Arc<dyn QueryExecutor>>,
    ) -> Self {
        let sources = SourceId::ALL
            .into_iter()
            .map(|id| (id, Source::build(id, client, config, executor.clone())))
            .collect();
        Self { sources }
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(&id)
    }

    /// 所有已註冊的來源
    pub fn list(&self) -> Vec<SourceId> {
        self.sources.keys().copied().collect()
    }

    pub fn is_available(&self, id: SourceId) -> bool {
        self.get(id).is_some_and(|s| s.is_available())
    }

    /// 已設定憑證、可實際呼叫的來源
    pub fn available(&self) -> Vec<SourceId> {
        self.sources
            .iter()
            .filter(|(_, source)| source.is_available())
            .map(|(id, _)| *id)
            .collect()
    }
}
