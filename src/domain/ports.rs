use crate::domain::model::{Domain, SourceId, SourceResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// 呼叫 adapter 時可選的提示
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichOptions {
    pub company_name: Option<String>,
    pub ticker: Option<String>,
    pub force_refresh: bool,
}

/// 外部資料供應商的統一介面
///
/// `enrich` never returns an error: every failure is folded into
/// `SourceResult::failure`. Implementations hold no state between calls.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    /// 憑證是否已設定；不得有副作用
    fn is_available(&self) -> bool;

    async fn enrich(&self, domain: &Domain, options: &EnrichOptions) -> SourceResult;

    /// 會改變查詢結果的提示；快取只在提示相同時命中
    fn cache_hint(&self, _options: &EnrichOptions) -> Option<String> {
        None
    }

    fn is_cacheable(&self, result: &SourceResult, _options: &EnrichOptions) -> bool {
        result.success
    }
}

/// 由呼叫端注入的文字查詢能力 (搜尋 / LLM 等)，核心只負責組查詢與解析結果
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str) -> Result<String>;
}

/// 一筆扁平化的公司資料列
pub type FlatRecord = Map<String, Value>;

/// 外部持久化目標；每個網域獨立 upsert，後寫入者覆蓋
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn upsert(&self, domain: &Domain, record: &FlatRecord) -> Result<()>;
}
