use crate::domain::model::Domain;
use crate::domain::ports::{FlatRecord, PersistenceSink};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 本機檔案 sink：每個網域一個 JSON 檔，後寫入者覆蓋
#[derive(Debug, Clone)]
pub struct LocalSink {
    base_path: PathBuf,
}

impl LocalSink {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn path_for(&self, domain: &Domain) -> PathBuf {
        self.base_path.join(format!("{}.json", domain))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl PersistenceSink for LocalSink {
    async fn upsert(&self, domain: &Domain, record: &FlatRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let full_path = self.path_for(domain);
        let data = serde_json::to_vec_pretty(record)?;

        // 先寫暫存檔再 rename，避免讀到寫一半的檔案
        let tmp_path = full_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &full_path).await?;

        tracing::debug!(domain = %domain, path = %full_path.display(), "record written");
        Ok(())
    }
}
