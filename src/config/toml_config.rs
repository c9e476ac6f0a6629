use crate::domain::model::SourceId;
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::{validate_positive_number, validate_range, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl CacheConfig {
    fn default_ttl_seconds() -> u64 {
        24 * 60 * 60
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: Self::default_ttl_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrency: usize,
    pub max_concurrency: usize,
    pub max_batch_size: usize,
    pub pacing_ms: u64,
}

impl BatchConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// 將呼叫端要求的並發數夾在 [1, max_concurrency]
    pub fn clamp_concurrency(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.concurrency)
            .clamp(1, self.max_concurrency.max(1))
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            max_concurrency: 10,
            max_batch_size: 100,
            pacing_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into(),
            timeout_seconds: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// 已設定的憑證；空字串或未替換的 `${VAR}` 視為未設定
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.contains("${"))
    }

    pub fn timeout(&self, source: SourceId) -> Duration {
        self.timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or_else(|| source.default_timeout())
    }

    fn traffic() -> Self {
        Self::new("https://api.similarweb.com")
    }

    fn techstack() -> Self {
        Self::new("https://api.builtwith.com")
    }

    fn financials() -> Self {
        Self::new("https://financialmodelingprep.com")
    }

    fn filings() -> Self {
        Self::new("https://efts.sec.gov")
    }

    fn hiring() -> Self {
        Self::new("https://api.theirstack.com")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderConfig::traffic")]
    pub traffic: ProviderConfig,
    #[serde(default = "ProviderConfig::techstack")]
    pub techstack: ProviderConfig,
    #[serde(default = "ProviderConfig::financials")]
    pub financials: ProviderConfig,
    #[serde(default = "ProviderConfig::filings")]
    pub filings: ProviderConfig,
    #[serde(default = "ProviderConfig::hiring")]
    pub hiring: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, source: SourceId) -> Option<&ProviderConfig> {
        match source {
            SourceId::Traffic => Some(&self.traffic),
            SourceId::TechStack => Some(&self.techstack),
            SourceId::Financials => Some(&self.financials),
            SourceId::Filings => Some(&self.filings),
            SourceId::Hiring => Some(&self.hiring),
            SourceId::Signals => None,
        }
    }

    /// 所有 provider 都指向同一個 base URL (測試用 mock server)
    pub fn all_at(base_url: &str, api_key: &str) -> Self {
        let provider = ProviderConfig::new(base_url).with_api_key(api_key);
        Self {
            traffic: provider.clone(),
            techstack: provider.clone(),
            financials: provider.clone(),
            filings: provider.clone(),
            hiring: provider,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            traffic: ProviderConfig::traffic(),
            techstack: ProviderConfig::techstack(),
            financials: ProviderConfig::financials(),
            filings: ProviderConfig::filings(),
            hiring: ProviderConfig::hiring(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// 覆寫預設的合作夥伴技術清單
    pub partner_technologies: Option<Vec<String>>,
}

impl EnrichConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EnrichError::ConfigValidation {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TRAFFIC_API_KEY})；找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EnrichError::ConfigValidation {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        for source in SourceId::ALL {
            let Some(provider) = self.providers.get(source) else {
                continue;
            };
            let prefix = format!("providers.{}", source);
            validate_url(&format!("{}.base_url", prefix), &provider.base_url)?;
            if let Some(timeout) = provider.timeout_seconds {
                validate_range(&format!("{}.timeout_seconds", prefix), timeout, 15, 120)?;
            }
        }

        validate_positive_number("batch.concurrency", self.batch.concurrency, 1)?;
        validate_positive_number("batch.max_concurrency", self.batch.max_concurrency, 1)?;
        validate_range("batch.max_batch_size", self.batch.max_batch_size, 1, 1000)?;

        Ok(())
    }

    /// 已設定憑證的 HTTP 來源
    pub fn configured_sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|source| {
                self.providers
                    .get(*source)
                    .is_some_and(|p| p.credential().is_some())
            })
            .collect()
    }
}

impl Validate for EnrichConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
