use crate::domain::payload::{
    FilingsData, FinancialData, HiringData, SignalsData, TechStackData, TrafficData,
};
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::{sanitize_domain, validate_domain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 已正規化且通過驗證的公司網域
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    pub fn parse(input: &str) -> Result<Self> {
        let sanitized = sanitize_domain(input);
        validate_domain(&sanitized).map_err(|e| match e {
            EnrichError::InvalidDomain { reason, .. } => EnrichError::InvalidDomain {
                input: input.to_string(),
                reason,
            },
            other => other,
        })?;
        Ok(Self(sanitized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Domain {
    type Error = EnrichError;

    fn try_from(value: String) -> Result<Self> {
        Domain::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

/// 已註冊的資料來源；新增來源即新增一個 variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Traffic,
    TechStack,
    Financials,
    Filings,
    Hiring,
    Signals,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::Traffic,
        SourceId::TechStack,
        SourceId::Financials,
        SourceId::Filings,
        SourceId::Hiring,
        SourceId::Signals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Traffic => "traffic",
            SourceId::TechStack => "tech_stack",
            SourceId::Financials => "financials",
            SourceId::Filings => "filings",
            SourceId::Hiring => "hiring",
            SourceId::Signals => "signals",
        }
    }

    /// 依預期回應大小設定的單次請求逾時
    pub fn default_timeout(&self) -> Duration {
        match self {
            SourceId::Traffic | SourceId::Financials | SourceId::Hiring => Duration::from_secs(30),
            SourceId::Filings => Duration::from_secs(45),
            SourceId::TechStack => Duration::from_secs(60),
            SourceId::Signals => Duration::from_secs(120),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "traffic" => Ok(SourceId::Traffic),
            "tech_stack" | "techstack" => Ok(SourceId::TechStack),
            "financials" | "financial" => Ok(SourceId::Financials),
            "filings" => Ok(SourceId::Filings),
            "hiring" => Ok(SourceId::Hiring),
            "signals" => Ok(SourceId::Signals),
            _ => Err(EnrichError::UnknownSource {
                name: s.to_string(),
            }),
        }
    }
}

/// 單一來源在一次呼叫中的狀態：pending → fetching → success | error | skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Pending,
    Fetching,
    Success,
    Error,
    Skipped,
}

impl SourceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SourceStatus::Success | SourceStatus::Error | SourceStatus::Skipped
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SourcePayload {
    Traffic(TrafficData),
    TechStack(TechStackData),
    Financials(FinancialData),
    Filings(FilingsData),
    Hiring(HiringData),
    Signals(SignalsData),
}

impl SourcePayload {
    pub fn source(&self) -> SourceId {
        match self {
            SourcePayload::Traffic(_) => SourceId::Traffic,
            SourcePayload::TechStack(_) => SourceId::TechStack,
            SourcePayload::Financials(_) => SourceId::Financials,
            SourcePayload::Filings(_) => SourceId::Filings,
            SourcePayload::Hiring(_) => SourceId::Hiring,
            SourcePayload::Signals(_) => SourceId::Signals,
        }
    }
}

/// 單一來源的抓取結果。只透過建構函式建立，保證 `success` 與 `data` 一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: SourceId,
    pub success: bool,
    pub data: Option<SourcePayload>,
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub cached: bool,
    #[serde(default)]
    pub skipped: bool,
}

impl SourceResult {
    pub fn success(payload: SourcePayload) -> Self {
        Self {
            source: payload.source(),
            success: true,
            data: Some(payload),
            error: None,
            fetched_at: Utc::now(),
            cached: false,
            skipped: false,
        }
    }

    pub fn failure(source: SourceId, message: impl Into<String>) -> Self {
        Self {
            source,
            success: false,
            data: None,
            error: Some(message.into()),
            fetched_at: Utc::now(),
            cached: false,
            skipped: false,
        }
    }

    /// 未設定憑證的來源，與「嘗試後失敗」區分
    pub fn skipped(source: SourceId) -> Self {
        Self {
            skipped: true,
            ..Self::failure(source, "not configured")
        }
    }

    pub fn into_cached(mut self) -> Self {
        self.cached = true;
        self
    }

    pub fn status(&self) -> SourceStatus {
        if self.success {
            SourceStatus::Success
        } else if self.skipped {
            SourceStatus::Skipped
        } else {
            SourceStatus::Error
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: SourceId,
    pub message: String,
}

/// 一次 orchestration 呼叫的彙整結果，回傳後不再變動
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub domain: Domain,
    pub results: BTreeMap<SourceId, SourceResult>,
    pub sources_requested: Vec<SourceId>,
    pub sources_completed: Vec<SourceId>,
    pub sources_failed: Vec<SourceId>,
    pub sources_skipped: Vec<SourceId>,
    pub errors: Vec<SourceFailure>,
    pub data_completeness: u8,
    pub enriched_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl EnrichmentRecord {
    /// 依來源結果分類並計算完整度；結果表必須涵蓋所有 requested 來源
    pub fn from_results(
        domain: Domain,
        sources_requested: Vec<SourceId>,
        results: BTreeMap<SourceId, SourceResult>,
        duration: Duration,
    ) -> Self {
        let mut sources_completed = Vec::new();
        let mut sources_failed = Vec::new();
        let mut sources_skipped = Vec::new();
        let mut errors = Vec::new();

        for source in &sources_requested {
            match results.get(source) {
                Some(result) => match result.status() {
                    SourceStatus::Success => sources_completed.push(*source),
                    SourceStatus::Skipped => sources_skipped.push(*source),
                    _ => {
                        sources_failed.push(*source);
                        errors.push(SourceFailure {
                            source: *source,
                            message: result
                                .error
                                .clone()
                                .unwrap_or_else(|| "unknown error".to_string()),
                        });
                    }
                },
                None => {
                    sources_failed.push(*source);
                    errors.push(SourceFailure {
                        source: *source,
                        message: "no result recorded".to_string(),
                    });
                }
            }
        }

        let data_completeness = completeness(sources_completed.len(), sources_requested.len());

        Self {
            domain,
            results,
            sources_requested,
            sources_completed,
            sources_failed,
            sources_skipped,
            errors,
            data_completeness,
            enriched_at: Utc::now(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn payload(&self, source: SourceId) -> Option<&SourcePayload> {
        self.results.get(&source).and_then(|r| r.data.as_ref())
    }

    pub fn traffic(&self) -> Option<&TrafficData> {
        match self.payload(SourceId::Traffic) {
            Some(SourcePayload::Traffic(data)) => Some(data),
            _ => None,
        }
    }

    pub fn techstack(&self) -> Option<&TechStackData> {
        match self.payload(SourceId::TechStack) {
            Some(SourcePayload::TechStack(data)) => Some(data),
            _ => None,
        }
    }

    pub fn financials(&self) -> Option<&FinancialData> {
        match self.payload(SourceId::Financials) {
            Some(SourcePayload::Financials(data)) => Some(data),
            _ => None,
        }
    }

    pub fn filings(&self) -> Option<&FilingsData> {
        match self.payload(SourceId::Filings) {
            Some(SourcePayload::Filings(data)) => Some(data),
            _ => None,
        }
    }

    pub fn hiring(&self) -> Option<&HiringData> {
        match self.payload(SourceId::Hiring) {
            Some(SourcePayload::Hiring(data)) => Some(data),
            _ => None,
        }
    }

    pub fn signals(&self) -> Option<&SignalsData> {
        match self.payload(SourceId::Signals) {
            Some(SourcePayload::Signals(data)) => Some(data),
            _ => None,
        }
    }
}

/// round(100 × completed / requested)，空集合為 0
pub fn completeness(completed: usize, requested: usize) -> u8 {
    if requested == 0 {
        return 0;
    }
    ((completed as f64 / requested as f64) * 100.0).round() as u8
}

/// 每個來源狀態轉換時發出的進度事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub domain: Domain,
    pub source: SourceId,
    pub status: SourceStatus,
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parse_sanitizes_input() {
        let domain = Domain::parse("HTTPS://www.Example.com/about").unwrap();
        assert_eq!(domain.as_str(), "example.com");

        let err = Domain::parse("not a domain").unwrap_err();
        match err {
            EnrichError::InvalidDomain { input, .. } => assert_eq!(input, "not a domain"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_source_id_round_trips_through_str() {
        for source in SourceId::ALL {
            assert_eq!(source.as_str().parse::<SourceId>().unwrap(), source);
        }
        assert_eq!("techstack".parse::<SourceId>().unwrap(), SourceId::TechStack);
        assert!("weather".parse::<SourceId>().is_err());
    }

    #[test]
    fn test_timeouts_within_bounds() {
        for source in SourceId::ALL {
            let secs = source.default_timeout().as_secs();
            assert!((15..=120).contains(&secs), "{} timeout {}", source, secs);
        }
    }

    #[test]
    fn test_source_result_invariants() {
        let ok = SourceResult::success(SourcePayload::Traffic(TrafficData::default()));
        assert!(ok.success && ok.data.is_some() && ok.error.is_none());
        assert_eq!(ok.status(), SourceStatus::Success);

        let failed = SourceResult::failure(SourceId::Hiring, "HTTP 500");
        assert!(!failed.success && failed.data.is_none());
        assert_eq!(failed.status(), SourceStatus::Error);

        let skipped = SourceResult::skipped(SourceId::Filings);
        assert!(!skipped.success && skipped.data.is_none());
        assert_eq!(skipped.status(), SourceStatus::Skipped);

        assert!(skipped.status().is_terminal());
        assert!(!SourceStatus::Fetching.is_terminal());
    }

    #[test]
    fn test_record_partitions_requested_sources() {
        let domain = Domain::parse("example.com").unwrap();
        let requested = vec![SourceId::Traffic, SourceId::Hiring, SourceId::Filings];
        let mut results = BTreeMap::new();
        results.insert(
            SourceId::Traffic,
            SourceResult::success(SourcePayload::Traffic(TrafficData::default())),
        );
        results.insert(SourceId::Hiring, SourceResult::failure(SourceId::Hiring, "timeout"));
        results.insert(SourceId::Filings, SourceResult::skipped(SourceId::Filings));

        let record =
            EnrichmentRecord::from_results(domain, requested, results, Duration::from_millis(5));

        assert_eq!(record.sources_completed, vec![SourceId::Traffic]);
        assert_eq!(record.sources_failed, vec![SourceId::Hiring]);
        assert_eq!(record.sources_skipped, vec![SourceId::Filings]);
        assert_eq!(record.errors.len(), 1);
        assert_eq!(record.errors[0].message, "timeout");
        assert_eq!(record.data_completeness, 33);
        assert!(record.traffic().is_some());
        assert!(record.hiring().is_none());
    }

    #[test]
    fn test_duration_saturates_instead_of_wrapping() {
        let domain = Domain::parse("example.com").unwrap();
        let record =
            EnrichmentRecord::from_results(domain.clone(), vec![], BTreeMap::new(), Duration::MAX);
        assert_eq!(record.duration_ms, u64::MAX);

        let record =
            EnrichmentRecord::from_results(domain, vec![], BTreeMap::new(), Duration::from_secs(2));
        assert_eq!(record.duration_ms, 2000);
    }

    #[test]
    fn test_completeness_handles_empty_request() {
        assert_eq!(completeness(0, 0), 0);
        assert_eq!(completeness(2, 3), 67);
        assert_eq!(completeness(6, 6), 100);
    }
}
