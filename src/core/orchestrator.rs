use crate::config::EnrichConfig;
use crate::core::cache::EnrichmentCache;
use crate::core::registry::{Registry, Source};
use crate::domain::model::{
    Domain, EnrichmentRecord, ProgressEvent, SourceId, SourceResult, SourceStatus,
};
use crate::domain::ports::{EnrichOptions, QueryExecutor, SourceAdapter};
use crate::utils::error::Result;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// 單次 enrichment 的參數
#[derive(Clone, Default)]
pub struct EnrichRequest {
    /// `None` 表示所有已註冊來源
    pub sources: Option<Vec<SourceId>>,
    pub force_refresh: bool,
    pub company_name: Option<String>,
    pub ticker: Option<String>,
    pub on_progress: Option<ProgressCallback>,
}

impl EnrichRequest {
    pub fn with_sources(mut self, sources: Vec<SourceId>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    fn options(&self) -> EnrichOptions {
        EnrichOptions {
            company_name: self.company_name.clone(),
            ticker: self.ticker.clone(),
            force_refresh: self.force_refresh,
        }
    }
}

/// 對單一網域並行查詢多個來源，容忍部分失敗
pub struct Orchestrator {
    registry: Arc<Registry>,
    cache: Arc<EnrichmentCache>,
}

impl Orchestrator {
    pub fn new(registry: Registry, cache: Arc<EnrichmentCache>) -> Self {
        Self {
            registry: Arc::new(registry),
            cache,
        }
    }

    pub fn from_config(
        config: &EnrichConfig,
        executor: Option<Arc<dyn QueryExecutor>>,
    ) -> Result<Self> {
        let registry = Registry::from_config(config, executor)?;
        let cache = Arc::new(EnrichmentCache::new(config.cache.ttl()));
        Ok(Self::new(registry, cache))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<EnrichmentCache> {
        &self.cache
    }

    /// 驗證網域後執行 enrichment；只有輸入錯誤會回傳 `Err`
    pub async fn enrich(&self, domain: &str, request: EnrichRequest) -> Result<EnrichmentRecord> {
        let domain = Domain::parse(domain)?;
        Ok(self.enrich_domain(&domain, &request).await)
    }

    /// 永遠回傳完整的 record，即使所有來源都失敗
    pub async fn enrich_domain(&self, domain: &Domain, request: &EnrichRequest) -> EnrichmentRecord {
        let started = Instant::now();
        let requested = self.requested_sources(request);
        let options = request.options();

        tracing::debug!(
            domain = %domain,
            sources = requested.len(),
            force_refresh = request.force_refresh,
            "🚀 starting enrichment"
        );

        for source in &requested {
            emit(&request.on_progress, domain, *source, SourceStatus::Pending, false);
        }

        let tasks: Vec<_> = requested
            .iter()
            .map(|&id| {
                let source = self.registry.get(id).cloned();
                let cache = Arc::clone(&self.cache);
                let domain = domain.clone();
                let options = options.clone();
                let progress = request.on_progress.clone();

                tokio::spawn(async move {
                    fetch_source(id, source, &cache, &domain, &options, &progress).await
                })
            })
            .collect();

        let joined = join_all(tasks).await;

        let mut results = BTreeMap::new();
        for (&id, outcome) in requested.iter().zip(joined) {
            let result = match outcome {
                Ok(result) => result,
                Err(join_error) => {
                    tracing::error!(domain = %domain, source = %id, error = %join_error, "source task failed");
                    emit(&request.on_progress, domain, id, SourceStatus::Error, false);
                    SourceResult::failure(id, format!("task failed: {}", join_error))
                }
            };
            results.insert(id, result);
        }

        let record =
            EnrichmentRecord::from_results(domain.clone(), requested, results, started.elapsed());

        tracing::info!(
            domain = %domain,
            completed = record.sources_completed.len(),
            failed = record.sources_failed.len(),
            skipped = record.sources_skipped.len(),
            completeness = record.data_completeness,
            duration_ms = record.duration_ms,
            "✅ enrichment finished"
        );

        record
    }

    /// 去除重複並保留原順序
    fn requested_sources(&self, request: &EnrichRequest) -> Vec<SourceId> {
        let candidates = request
            .sources
            .clone()
            .unwrap_or_else(|| self.registry.list());

        let mut requested = Vec::with_capacity(candidates.len());
        for source in candidates {
            if !requested.contains(&source) {
                requested.push(source);
            }
        }
        requested
    }
}

async fn fetch_source(
    id: SourceId,
    source: Option<Source>,
    cache: &EnrichmentCache,
    domain: &Domain,
    options: &EnrichOptions,
    progress: &Option<ProgressCallback>,
) -> SourceResult {
    let Some(source) = source else {
        emit(progress, domain, id, SourceStatus::Error, false);
        return SourceResult::failure(id, "source not registered");
    };

    if !source.is_available() {
        tracing::debug!(domain = %domain, source = %id, "⏭️ source not configured");
        emit(progress, domain, id, SourceStatus::Skipped, false);
        return SourceResult::skipped(id);
    }

    let hint = source.cache_hint(options);
    if !options.force_refresh {
        if let Some(hit) = cache.get_hinted(id, domain, hint.as_deref()).await {
            tracing::debug!(domain = %domain, source = %id, "cache hit");
            emit(progress, domain, id, SourceStatus::Success, true);
            return hit.into_cached();
        }
    }

    emit(progress, domain, id, SourceStatus::Fetching, false);
    let result = source.enrich(domain, options).await;

    if source.is_cacheable(&result, options) {
        cache.set_hinted(id, domain, hint, result.clone()).await;
    }

    emit(progress, domain, id, result.status(), false);
    result
}

fn emit(
    progress: &Option<ProgressCallback>,
    domain: &Domain,
    source: SourceId,
    status: SourceStatus,
    cached: bool,
) {
    if let Some(callback) = progress {
        callback(ProgressEvent {
            domain: domain.clone(),
            source,
            status,
            cached,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvidersConfig;
    use crate::utils::error::EnrichError;
    use std::sync::Mutex;

    fn orchestrator(config: EnrichConfig) -> Orchestrator {
        Orchestrator::from_config(&config, None).unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_sources_are_skipped_not_failed() {
        let orchestrator = orchestrator(EnrichConfig::default());
        let record = orchestrator
            .enrich("https://www.example.com/", EnrichRequest::default())
            .await
            .unwrap();

        assert_eq!(record.domain.as_str(), "example.com");
        assert_eq!(record.sources_requested, SourceId::ALL.to_vec());
        assert_eq!(record.sources_skipped, SourceId::ALL.to_vec());
        assert!(record.sources_failed.is_empty());
        assert!(record.errors.is_empty());
        assert_eq!(record.data_completeness, 0);
    }

    #[tokio::test]
    async fn test_invalid_domain_is_rejected_before_fetching() {
        let orchestrator = orchestrator(EnrichConfig::default());
        let err = orchestrator
            .enrich("not_a_domain", EnrichRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::InvalidDomain { .. }));
    }

    #[tokio::test]
    async fn test_empty_source_list_has_zero_completeness() {
        let orchestrator = orchestrator(EnrichConfig::default());
        let record = orchestrator
            .enrich("example.com", EnrichRequest::default().with_sources(vec![]))
            .await
            .unwrap();

        assert!(record.sources_requested.is_empty());
        assert!(record.results.is_empty());
        assert_eq!(record.data_completeness, 0);
    }

    #[tokio::test]
    async fn test_duplicate_sources_are_requested_once() {
        let orchestrator = orchestrator(EnrichConfig::default());
        let request = EnrichRequest::default().with_sources(vec![
            SourceId::Hiring,
            SourceId::Traffic,
            SourceId::Hiring,
        ]);
        let record = orchestrator.enrich("example.com", request).await.unwrap();
        assert_eq!(
            record.sources_requested,
            vec![SourceId::Hiring, SourceId::Traffic]
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_error_and_progress_events() {
        // 9 號埠 (discard) 幾乎不會有服務在聽
        let config = EnrichConfig {
            providers: ProvidersConfig::all_at("http://127.0.0.1:9", "key"),
            ..EnrichConfig::default()
        };
        let orchestrator = orchestrator(config);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let request = EnrichRequest {
            sources: Some(vec![SourceId::Traffic, SourceId::Signals]),
            on_progress: Some(Arc::new(move |event: ProgressEvent| {
                sink.lock().unwrap().push((event.source, event.status));
            })),
            ..EnrichRequest::default()
        };

        let record = orchestrator.enrich("example.com", request).await.unwrap();

        assert_eq!(record.sources_failed, vec![SourceId::Traffic]);
        assert_eq!(record.sources_skipped, vec![SourceId::Signals]);
        assert_eq!(record.errors[0].source, SourceId::Traffic);
        assert!(!orchestrator.cache().has(SourceId::Traffic, &record.domain).await);

        let events = events.lock().unwrap();
        let traffic: Vec<_> = events
            .iter()
            .filter(|(s, _)| *s == SourceId::Traffic)
            .map(|(_, status)| *status)
            .collect();
        assert_eq!(
            traffic,
            vec![SourceStatus::Pending, SourceStatus::Fetching, SourceStatus::Error]
        );
        assert!(events.contains(&(SourceId::Signals, SourceStatus::Skipped)));
    }

    #[tokio::test]
    async fn test_cache_hit_is_marked_cached() {
        let config = EnrichConfig {
            providers: ProvidersConfig::all_at("http://127.0.0.1:9", "key"),
            ..EnrichConfig::default()
        };
        let orchestrator = orchestrator(config);
        let domain = Domain::parse("example.com").unwrap();

        let seeded = SourceResult::success(crate::domain::model::SourcePayload::Traffic(
            Default::default(),
        ));
        orchestrator
            .cache()
            .set(SourceId::Traffic, &domain, seeded)
            .await;

        let request = EnrichRequest::default().with_sources(vec![SourceId::Traffic]);
        let record = orchestrator.enrich_domain(&domain, &request).await;

        let traffic = &record.results[&SourceId::Traffic];
        assert!(traffic.success && traffic.cached);
        assert_eq!(record.data_completeness, 100);

        // force refresh 會繞過快取並真的發請求 (此處失敗)
        let forced = orchestrator
            .enrich_domain(&domain, &request.clone().force_refresh())
            .await;
        assert_eq!(forced.sources_failed, vec![SourceId::Traffic]);
    }
}
