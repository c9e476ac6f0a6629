use crate::config::BatchConfig;
use crate::core::orchestrator::{EnrichRequest, Orchestrator, ProgressCallback};
use crate::core::scoring::{score_record, CompositeScore, KnownAttributes};
use crate::domain::model::{Domain, EnrichmentRecord, SourceId};
use crate::domain::ports::PersistenceSink;
use crate::utils::error::{EnrichError, Result};
use crate::utils::monitor::SystemMonitor;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 回報格式 (已完成數, 總數, 網域)
pub type DomainCompleteCallback = Arc<dyn Fn(usize, usize, &Domain) + Send + Sync>;

/// 錯誤訊息樣本的上限
const INVALID_SAMPLE_LIMIT: usize = 5;

/// 單一網域的查詢提示 (同一批次裡每家公司的名稱與 ticker 各不相同)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyHints {
    pub company_name: Option<String>,
    pub ticker: Option<String>,
}

#[derive(Clone, Default)]
pub struct BatchOptions {
    /// 會被夾在 [1, max_concurrency]
    pub concurrency: Option<usize>,
    /// 批次之間的延遲；`None` 使用設定值
    pub pacing: Option<Duration>,
    pub sources: Option<Vec<SourceId>>,
    pub force_refresh: bool,
    /// 套用到所有網域的已知屬性
    pub known: KnownAttributes,
    /// 個別網域的已知屬性，優先於 `known`
    pub known_by_domain: HashMap<Domain, KnownAttributes>,
    /// 沒有提示的網域只以網域查詢
    pub hints_by_domain: HashMap<Domain, CompanyHints>,
    pub on_progress: Option<ProgressCallback>,
    pub on_domain_complete: Option<DomainCompleteCallback>,
    pub cancel: Option<CancellationToken>,
}

/// 每個輸入網域必定有一筆
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchEntry {
    pub record: Option<EnrichmentRecord>,
    pub score: Option<CompositeScore>,
    pub error: Option<String>,
}

impl BatchEntry {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

pub struct BatchCoordinator {
    orchestrator: Arc<Orchestrator>,
    sink: Option<Arc<dyn PersistenceSink>>,
    config: BatchConfig,
    monitor: Arc<SystemMonitor>,
}

impl BatchCoordinator {
    pub fn new(orchestrator: Arc<Orchestrator>, config: BatchConfig) -> Self {
        Self {
            orchestrator,
            sink: None,
            config,
            monitor: Arc::new(SystemMonitor::default()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = Arc::new(monitor);
        self
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// 接受未定型別的輸入 (例如 HTTP body)；必須是字串陣列
    pub async fn enrich_batch_json(
        &self,
        input: &Value,
        options: BatchOptions,
    ) -> Result<HashMap<Domain, BatchEntry>> {
        let Value::Array(items) = input else {
            return Err(EnrichError::Validation {
                message: "batch input must be a JSON array of domains".to_string(),
            });
        };

        let domains = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| EnrichError::Validation {
                        message: format!("batch item {} is not a string: {}", index, item),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        self.enrich_batch(&domains, options).await
    }

    /// 分批處理；輸入驗證失敗時不會發出任何請求
    pub async fn enrich_batch(
        &self,
        domains: &[String],
        options: BatchOptions,
    ) -> Result<HashMap<Domain, BatchEntry>> {
        let subjects = self.validate(domains)?;
        let mut entries = HashMap::with_capacity(subjects.len());
        if subjects.is_empty() {
            return Ok(entries);
        }

        let concurrency = self.config.clamp_concurrency(options.concurrency);
        let pacing = options.pacing.unwrap_or_else(|| self.config.pacing());
        let total = subjects.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let batch_count = total.div_ceil(concurrency);

        tracing::info!(
            domains = total,
            concurrency,
            batches = batch_count,
            "📦 starting batch enrichment"
        );

        for (batch_idx, chunk) in subjects.chunks(concurrency).enumerate() {
            if is_cancelled(&options.cancel) {
                break;
            }

            let tasks: Vec<_> = chunk
                .iter()
                .map(|domain| {
                    let orchestrator = Arc::clone(&self.orchestrator);
                    let sink = self.sink.clone();
                    let domain = domain.clone();
                    let hints = options
                        .hints_by_domain
                        .get(&domain)
                        .cloned()
                        .unwrap_or_default();
                    let request = EnrichRequest {
                        sources: options.sources.clone(),
                        force_refresh: options.force_refresh,
                        company_name: hints.company_name,
                        ticker: hints.ticker,
                        on_progress: options.on_progress.clone(),
                    };
                    let known = options
                        .known_by_domain
                        .get(&domain)
                        .cloned()
                        .unwrap_or_else(|| options.known.clone());
                    let completed = Arc::clone(&completed);
                    let on_complete = options.on_domain_complete.clone();

                    tokio::spawn(async move {
                        let entry =
                            process_subject(&orchestrator, sink.as_deref(), &domain, &request, &known)
                                .await;
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        if let Some(callback) = on_complete {
                            callback(done, total, &domain);
                        }
                        entry
                    })
                })
                .collect();

            let outcomes = join_all(tasks).await;
            for (domain, outcome) in chunk.iter().zip(outcomes) {
                let entry = outcome.unwrap_or_else(|join_error| {
                    tracing::error!(domain = %domain, error = %join_error, "subject task failed");
                    BatchEntry::failed(format!("task failed: {}", join_error))
                });
                entries.insert(domain.clone(), entry);
            }

            tracing::debug!(
                batch = batch_idx + 1,
                batches = batch_count,
                completed = completed.load(Ordering::SeqCst),
                "batch finished"
            );
            self.monitor.log_stats("batch");

            if batch_idx + 1 < batch_count && !pacing.is_zero() {
                pause(pacing, &options.cancel).await;
            }
        }

        // 取消後剩下的網域仍要有結果
        let mut cancelled = 0;
        for domain in &subjects {
            entries.entry(domain.clone()).or_insert_with(|| {
                cancelled += 1;
                BatchEntry::failed("cancelled")
            });
        }
        if cancelled > 0 {
            tracing::warn!(cancelled, "⏹️ batch cancelled before all domains were processed");
        }

        tracing::info!(
            domains = total,
            completed = completed.load(Ordering::SeqCst),
            "✅ batch enrichment finished"
        );
        Ok(entries)
    }

    /// 大小上限、網域格式、去除重複
    fn validate(&self, domains: &[String]) -> Result<Vec<Domain>> {
        if domains.len() > self.config.max_batch_size {
            return Err(EnrichError::BatchTooLarge {
                size: domains.len(),
                max: self.config.max_batch_size,
            });
        }

        let mut invalid = Vec::new();
        let mut seen = HashSet::new();
        let mut subjects = Vec::with_capacity(domains.len());

        for input in domains {
            match Domain::parse(input) {
                Ok(domain) => {
                    if seen.insert(domain.clone()) {
                        subjects.push(domain);
                    }
                }
                Err(_) => invalid.push(input.clone()),
            }
        }

        if !invalid.is_empty() {
            let count = invalid.len();
            invalid.truncate(INVALID_SAMPLE_LIMIT);
            return Err(EnrichError::InvalidDomains {
                count,
                sample: invalid,
            });
        }

        Ok(subjects)
    }
}

async fn process_subject(
    orchestrator: &Orchestrator,
    sink: Option<&dyn PersistenceSink>,
    domain: &Domain,
    request: &EnrichRequest,
    known: &KnownAttributes,
) -> BatchEntry {
    let record = orchestrator.enrich_domain(domain, request).await;
    let score = score_record(&record, known);

    let error = match sink {
        Some(sink) => persist(sink, &record, &score).await.err().map(|e| {
            tracing::warn!(domain = %domain, error = %e, "failed to persist record");
            e.to_string()
        }),
        None => None,
    };

    BatchEntry {
        record: Some(record),
        score: Some(score),
        error,
    }
}

async fn persist(
    sink: &dyn PersistenceSink,
    record: &EnrichmentRecord,
    score: &CompositeScore,
) -> Result<()> {
    let row = record.to_flat_record(score)?;
    sink.upsert(&record.domain, &row).await
}

fn is_cancelled(cancel: &Option<CancellationToken>) -> bool {
    cancel.as_ref().is_some_and(|token| token.is_cancelled())
}

/// 等待 pacing，取消時提早結束
async fn pause(pacing: Duration, cancel: &Option<CancellationToken>) {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(pacing) => {}
                _ = token.cancelled() => {}
            }
        }
        None => tokio::time::sleep(pacing).await,
    }
}
