use crate::domain::model::{Domain, SourceId, SourceResult};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

type CacheKey = (SourceId, Domain);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: SourceResult,
    /// 產生此結果時的提示 (ticker / 公司名稱)
    hint: Option<String>,
    inserted_at: Instant,
}

/// (來源, 網域) → 結果的 TTL 快取
///
/// Expired entries are only removed when they are read. There is no capacity
/// bound; the cache lives as long as the orchestrator that owns it.
///
/// Each entry remembers the hint it was fetched with. A lookup with a
/// different hint is a miss, and the next write replaces the entry.
#[derive(Debug)]
pub struct EnrichmentCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl EnrichmentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) <= self.ttl
    }

    pub async fn get(&self, source: SourceId, domain: &Domain) -> Option<SourceResult> {
        self.get_hinted(source, domain, None).await
    }

    /// 只有在保存的提示與 `hint` 相同時才命中
    pub async fn get_hinted(
        &self,
        source: SourceId,
        domain: &Domain,
        hint: Option<&str>,
    ) -> Option<SourceResult> {
        let key = (source, domain.clone());
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                None => return None,
                Some(entry) if self.is_fresh(entry, now) => {
                    return (entry.hint.as_deref() == hint).then(|| entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // 過期：拿寫鎖後再確認一次，避免刪掉剛寫入的新值
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(&key) {
            if self.is_fresh(entry, Instant::now()) {
                return (entry.hint.as_deref() == hint).then(|| entry.value.clone());
            }
            entries.remove(&key);
            tracing::debug!(domain = %domain, source = %source, "cache entry expired");
        }
        None
    }

    pub async fn set(&self, source: SourceId, domain: &Domain, value: SourceResult) {
        self.set_hinted(source, domain, None, value).await;
    }

    pub async fn set_hinted(
        &self,
        source: SourceId,
        domain: &Domain,
        hint: Option<String>,
        value: SourceResult,
    ) {
        let entry = CacheEntry {
            value,
            hint,
            inserted_at: Instant::now(),
        };
        self.entries
            .write()
            .await
            .insert((source, domain.clone()), entry);
    }

    pub async fn has(&self, source: SourceId, domain: &Domain) -> bool {
        self.get(source, domain).await.is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// 目前保存的項目數 (含尚未被讀取淘汰的過期項目)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
