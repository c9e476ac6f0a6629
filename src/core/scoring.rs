//! 四因子綜合評分 (Fit / Intent / Value / Displacement)
//!
//! `score()` 是純函式：相同的 [`ScoringAttributes`] 永遠得到相同的
//! [`CompositeScore`]。每個因子獨立落在 0 - 100，總分為四者等權重平均。

use crate::domain::model::{Domain, EnrichmentRecord, SourcePayload};
use crate::domain::payload::{FinancialOutcome, HiringData};
use crate::domain::ports::FlatRecord;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// 權重與門檻
// ---------------------------------------------------------------------------

/// 四因子等權重
pub const FACTOR_WEIGHT: f64 = 0.25;

pub const HOT_THRESHOLD: u8 = 80;
pub const WARM_THRESHOLD: u8 = 40;

/// 信心度門檻 (訊號覆蓋百分比)
pub const HIGH_CONFIDENCE: u8 = 80;
pub const MEDIUM_CONFIDENCE: u8 = 40;

/// 沒有任何流量或財務資料時的 Value 下限
pub const VALUE_FLOOR: u8 = 10;

/// 信心度計算所用的訊號欄位總數
pub const SIGNAL_FIELDS: usize = 10;

const PARTNER_MATCH_POINTS: u32 = 20;
const PARTNER_MATCH_CAP: u32 = 40;

const LEGACY_SEARCH: [&str; 3] = ["elasticsearch", "solr", "opensearch"];

// ---------------------------------------------------------------------------
// 輸入與輸出
// ---------------------------------------------------------------------------

/// 呼叫端先前已知、不需要重新抓取的屬性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnownAttributes {
    pub industry: Option<String>,
    pub monthly_visits: Option<u64>,
    pub revenue: Option<f64>,
}

/// 評分輸入：所有來源 payload 的聯集，加上呼叫端已知屬性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringAttributes {
    pub industry: Option<String>,
    pub technologies: Vec<String>,
    pub partner_technologies: Vec<String>,
    pub search_provider: Option<String>,
    pub monthly_visits: Option<u64>,
    pub bounce_rate: Option<f64>,
    pub pages_per_visit: Option<f64>,
    pub revenue: Option<f64>,
    pub market_cap: Option<f64>,
    pub revenue_history_years: usize,
    pub hiring: Option<HiringData>,
    pub themes: Vec<String>,
    pub quote_count: usize,
}

impl ScoringAttributes {
    /// 抓取到的資料優先，已知屬性只補缺
    pub fn from_record(record: &EnrichmentRecord, known: &KnownAttributes) -> Self {
        let mut attributes = ScoringAttributes {
            industry: known.industry.clone().filter(|s| !s.trim().is_empty()),
            ..Default::default()
        };

        if let Some(tech) = record.techstack() {
            attributes.technologies = tech.technologies.iter().map(|t| t.name.clone()).collect();
            attributes.partner_technologies = tech.partner_technologies.clone();
            attributes.search_provider = tech.search_provider.clone();
        }

        if let Some(traffic) = record.traffic() {
            attributes.monthly_visits = traffic.monthly_visits;
            attributes.bounce_rate = traffic.bounce_rate;
            attributes.pages_per_visit = traffic.pages_per_visit;
        }

        if let Some(financials) = record.financials() {
            if let FinancialOutcome::Public(summary) = &financials.outcome {
                attributes.revenue = summary.revenue;
                attributes.market_cap = summary.market_cap;
                attributes.revenue_history_years =
                    summary.history.iter().filter(|y| y.revenue.is_some()).count();
            }
        }

        attributes.hiring = record.hiring().cloned();

        if let Some(signals) = record.signals() {
            attributes.themes = signals.themes.clone();
            attributes.quote_count = signals.quotes.len();
        }

        attributes.monthly_visits = attributes.monthly_visits.or(known.monthly_visits);
        attributes.revenue = attributes.revenue.or(known.revenue);
        attributes
    }

    /// 十個訊號欄位中實際有值的數量
    pub fn signals_present(&self) -> usize {
        [
            self.industry.is_some(),
            !self.technologies.is_empty(),
            !self.partner_technologies.is_empty(),
            self.search_provider.is_some(),
            self.monthly_visits.is_some(),
            self.bounce_rate.is_some() || self.pages_per_visit.is_some(),
            self.revenue.is_some(),
            self.market_cap.is_some(),
            self.hiring.is_some(),
            !self.themes.is_empty(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_coverage(percent: u8) -> Self {
        if percent >= HIGH_CONFIDENCE {
            Confidence::High
        } else if percent >= MEDIUM_CONFIDENCE {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// 三段式分級：Hot ≥ 80，Warm ≥ 40，其餘 Cold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Hot,
    Warm,
    Cold,
}

impl LeadStatus {
    pub fn from_total(total: u8) -> Self {
        if total >= HOT_THRESHOLD {
            LeadStatus::Hot
        } else if total >= WARM_THRESHOLD {
            LeadStatus::Warm
        } else {
            LeadStatus::Cold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Hot => "hot",
            LeadStatus::Warm => "warm",
            LeadStatus::Cold => "cold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub fit: u8,
    pub intent: u8,
    pub value: u8,
    pub displacement: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub total: u8,
    pub factors: ScoreFactors,
    pub confidence: Confidence,
    /// 訊號欄位覆蓋率，與 `EnrichmentRecord::data_completeness` 不同
    pub data_completeness: u8,
    pub status: LeadStatus,
}

// ---------------------------------------------------------------------------
// 評分
// ---------------------------------------------------------------------------

pub fn score(attributes: &ScoringAttributes) -> CompositeScore {
    let factors = ScoreFactors {
        fit: fit_score(attributes),
        intent: intent_score(attributes),
        value: value_score(attributes),
        displacement: displacement_score(attributes),
    };

    let sum = factors.fit as f64 + factors.intent as f64 + factors.value as f64
        + factors.displacement as f64;
    let total = (sum * FACTOR_WEIGHT).round().clamp(0.0, 100.0) as u8;

    let coverage =
        ((attributes.signals_present() as f64 / SIGNAL_FIELDS as f64) * 100.0).round() as u8;

    CompositeScore {
        total,
        factors,
        confidence: Confidence::from_coverage(coverage),
        data_completeness: coverage,
        status: LeadStatus::from_total(total),
    }
}

/// `ScoringAttributes::from_record` + `score`
pub fn score_record(record: &EnrichmentRecord, known: &KnownAttributes) -> CompositeScore {
    score(&ScoringAttributes::from_record(record, known))
}

fn clamp(points: u32) -> u8 {
    points.min(100) as u8
}

/// 產業分類分數；未知產業給最低分
pub fn vertical_points(industry: Option<&str>) -> u32 {
    let Some(industry) = industry else {
        return 10;
    };
    let industry = industry.to_lowercase();
    let has = |keys: &[&str]| keys.iter().any(|k| industry.contains(k));

    if has(&["retail", "ecommerce", "e-commerce", "apparel", "fashion", "consumer goods"]) {
        60
    } else if has(&["media", "publishing", "news", "entertainment"]) {
        50
    } else if has(&["software", "saas", "internet", "technology"]) {
        45
    } else if has(&["financ", "bank", "insurance"]) {
        35
    } else {
        20
    }
}

fn fit_score(attributes: &ScoringAttributes) -> u8 {
    let vertical = vertical_points(attributes.industry.as_deref());
    let partners = (attributes.partner_technologies.len() as u32 * PARTNER_MATCH_POINTS)
        .min(PARTNER_MATCH_CAP);
    clamp(vertical + partners)
}

fn intent_score(attributes: &ScoringAttributes) -> u8 {
    let hiring = attributes.hiring.as_ref().map_or(0, |hiring| {
        let tiers = &hiring.tiers;
        let tier_points = (tiers.executive * 15
            + tiers.director * 10
            + tiers.manager * 5
            + tiers.individual * 2)
            .min(50);
        let keyword_points = (hiring.keyword_hits.values().sum::<u32>() * 5).min(20);
        (tier_points + keyword_points).min(60)
    });

    let themes = (attributes.themes.len() as u32 * 10).min(30);
    let quotes = (attributes.quote_count as u32 * 5).min(10);

    clamp(hiring + themes + quotes)
}

/// 流量級距
pub fn traffic_tier_points(monthly_visits: u64) -> u32 {
    match monthly_visits {
        v if v >= 50_000_000 => 60,
        v if v >= 10_000_000 => 45,
        v if v >= 1_000_000 => 30,
        v if v >= 100_000 => 15,
        _ => 5,
    }
}

/// 營收級距；有營收資料至少 15 分
pub fn revenue_tier_points(revenue: f64) -> u32 {
    if revenue >= 10_000_000_000.0 {
        40
    } else if revenue >= 1_000_000_000.0 {
        30
    } else if revenue >= 100_000_000.0 {
        20
    } else {
        15
    }
}

fn value_score(attributes: &ScoringAttributes) -> u8 {
    let traffic = attributes.monthly_visits.map_or(0, traffic_tier_points);

    let financial = match (attributes.revenue, attributes.market_cap) {
        (Some(revenue), _) => {
            let history_bonus = if attributes.revenue_history_years >= 3 { 5 } else { 0 };
            revenue_tier_points(revenue) + history_bonus
        }
        (None, Some(_)) => 15,
        (None, None) => 0,
    };

    clamp(traffic + financial).max(VALUE_FLOOR)
}

fn displacement_score(attributes: &ScoringAttributes) -> u8 {
    let incumbent = match attributes.search_provider.as_deref() {
        Some(provider) => {
            let provider = provider.to_lowercase();
            if LEGACY_SEARCH.iter().any(|legacy| provider.contains(legacy)) {
                70
            } else {
                50
            }
        }
        None => 30,
    };

    // 規模越小越容易換掉現有方案
    let ease = match attributes.monthly_visits {
        None => 5,
        Some(v) if v < 1_000_000 => 20,
        Some(v) if v <= 10_000_000 => 10,
        Some(_) => 0,
    };

    clamp(incumbent + ease)
}

// ---------------------------------------------------------------------------
// 持久化列
// ---------------------------------------------------------------------------

impl EnrichmentRecord {
    /// 展平成一列：`{source}_{field}` 為各成功來源的標準欄位，`score_*` 為評分
    pub fn to_flat_record(&self, score: &CompositeScore) -> Result<FlatRecord> {
        let mut row = FlatRecord::new();
        row.insert("domain".to_string(), Value::from(self.domain.as_str()));
        row.insert("enriched_at".to_string(), Value::from(self.enriched_at.to_rfc3339()));
        row.insert(
            "data_completeness".to_string(),
            Value::from(self.data_completeness),
        );
        row.insert(
            "sources_completed".to_string(),
            serde_json::to_value(&self.sources_completed)?,
        );
        row.insert(
            "sources_failed".to_string(),
            serde_json::to_value(&self.sources_failed)?,
        );

        for result in self.results.values().filter(|r| r.success) {
            let Some(payload) = &result.data else {
                continue;
            };
            let prefix = payload.source().as_str();
            if let Value::Object(fields) = payload_value(payload)? {
                for (field, value) in fields {
                    row.insert(format!("{}_{}", prefix, field), value);
                }
            }
        }

        row.insert("score_total".to_string(), Value::from(score.total));
        row.insert("score_fit".to_string(), Value::from(score.factors.fit));
        row.insert("score_intent".to_string(), Value::from(score.factors.intent));
        row.insert("score_value".to_string(), Value::from(score.factors.value));
        row.insert(
            "score_displacement".to_string(),
            Value::from(score.factors.displacement),
        );
        row.insert(
            "score_confidence".to_string(),
            Value::from(score.confidence.as_str()),
        );
        row.insert(
            "score_data_completeness".to_string(),
            Value::from(score.data_completeness),
        );
        row.insert("lead_status".to_string(), Value::from(score.status.as_str()));

        Ok(row)
    }
}

fn payload_value(payload: &SourcePayload) -> Result<Value> {
    let value = match payload {
        SourcePayload::Traffic(data) => serde_json::to_value(data)?,
        SourcePayload::TechStack(data) => serde_json::to_value(data)?,
        SourcePayload::Financials(data) => serde_json::to_value(data)?,
        SourcePayload::Filings(data) => serde_json::to_value(data)?,
        SourcePayload::Hiring(data) => serde_json::to_value(data)?,
        SourcePayload::Signals(data) => serde_json::to_value(data)?,
    };
    Ok(value)
}

/// 列的主鍵
pub fn flat_record_key(row: &FlatRecord) -> Option<Domain> {
    row.get("domain")
        .and_then(Value::as_str)
        .and_then(|d| Domain::parse(d).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{SourceId, SourceResult};
    use crate::domain::payload::{
        FinancialData, FinancialSummary, SeniorityTiers, TechStackData, Technology,
        YearlyFinancials,
    };
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn techstack_result() -> SourceResult {
        SourceResult::success(SourcePayload::TechStack(TechStackData {
            technologies: vec![
                Technology {
                    name: "Shopify Plus".to_string(),
                    category: Some("ecommerce".to_string()),
                },
                Technology {
                    name: "Elasticsearch".to_string(),
                    category: Some("search".to_string()),
                },
            ],
            partner_technologies: vec![],
            search_provider: Some("Elasticsearch".to_string()),
            ..Default::default()
        }))
    }

    fn record_with(results: Vec<SourceResult>) -> EnrichmentRecord {
        let domain = Domain::parse("example.com").unwrap();
        let requested = SourceId::ALL.to_vec();
        let mut map = BTreeMap::new();
        for id in SourceId::ALL {
            map.insert(id, SourceResult::skipped(id));
        }
        for result in results {
            map.insert(result.source, result);
        }
        EnrichmentRecord::from_results(domain, requested, map, Duration::from_millis(5))
    }

    #[test]
    fn test_techstack_only_scores_low_confidence_with_value_floor() {
        let record = record_with(vec![techstack_result()]);
        assert_eq!(record.data_completeness, 17);

        let score = score_record(&record, &KnownAttributes::default());
        assert_eq!(score.confidence, Confidence::Low);
        assert_eq!(score.factors.value, VALUE_FLOOR);
        // Elasticsearch 自建 + 規模未知
        assert_eq!(score.factors.displacement, 75);
        assert!(score.total <= 100);
    }

    #[test]
    fn test_financial_data_raises_value() {
        let baseline = score_record(&record_with(vec![techstack_result()]), &KnownAttributes::default());

        let financials = SourceResult::success(SourcePayload::Financials(FinancialData {
            ticker: Some("ACME".to_string()),
            outcome: FinancialOutcome::Public(FinancialSummary {
                revenue: Some(2_500_000_000.0),
                market_cap: Some(9_000_000_000.0),
                history: (2021..=2024)
                    .map(|year| YearlyFinancials {
                        year,
                        revenue: Some(2_000_000_000.0),
                        net_income: None,
                    })
                    .collect(),
                ..Default::default()
            }),
        }));
        let enriched = score_record(
            &record_with(vec![techstack_result(), financials]),
            &KnownAttributes::default(),
        );

        assert!(enriched.factors.value > baseline.factors.value);
        assert_eq!(enriched.factors.value, 35);
    }

    #[test]
    fn test_not_public_financials_do_not_count_as_revenue() {
        let financials = SourceResult::success(SourcePayload::Financials(FinancialData {
            ticker: None,
            outcome: FinancialOutcome::NotPublic,
        }));
        let attributes = ScoringAttributes::from_record(
            &record_with(vec![financials]),
            &KnownAttributes::default(),
        );
        assert!(attributes.revenue.is_none());
        assert_eq!(attributes.signals_present(), 0);
    }

    #[test]
    fn test_known_attributes_fill_gaps() {
        let known = KnownAttributes {
            industry: Some("Online Retail".to_string()),
            monthly_visits: Some(12_000_000),
            revenue: None,
        };
        let attributes = ScoringAttributes::from_record(&record_with(vec![]), &known);
        assert_eq!(attributes.monthly_visits, Some(12_000_000));

        let score = score(&attributes);
        assert_eq!(score.factors.fit, 60);
        assert_eq!(score.factors.value, 45);
        assert_eq!(score.factors.displacement, 30);
    }

    #[test]
    fn test_fully_populated_profile_is_high_confidence() {
        let attributes = ScoringAttributes {
            industry: Some("ecommerce".to_string()),
            technologies: vec!["Adobe Experience Manager".to_string()],
            partner_technologies: vec![
                "Adobe Experience Manager".to_string(),
                "Salesforce Commerce Cloud".to_string(),
            ],
            search_provider: Some("Solr".to_string()),
            monthly_visits: Some(800_000),
            bounce_rate: Some(0.4),
            pages_per_visit: None,
            revenue: Some(20_000_000_000.0),
            market_cap: Some(50_000_000_000.0),
            revenue_history_years: 5,
            hiring: Some(HiringData {
                total_openings: 12,
                tiers: SeniorityTiers {
                    executive: 1,
                    director: 2,
                    manager: 3,
                    individual: 6,
                },
                keyword_hits: BTreeMap::from([("search".to_string(), 3)]),
                relevant_roles: vec![],
            }),
            themes: vec!["search".to_string(), "personalization".to_string()],
            quote_count: 4,
        };

        let score = score(&attributes);
        assert_eq!(score.confidence, Confidence::High);
        assert_eq!(score.data_completeness, 100);
        assert_eq!(score.factors.fit, 100);
        // 50 (tiers) + 15 (keywords) 上限 60，themes 20，quotes 10
        assert_eq!(score.factors.intent, 90);
        assert_eq!(score.factors.value, 60);
        assert_eq!(score.factors.displacement, 90);
        assert_eq!(score.total, 85);
        assert_eq!(score.status, LeadStatus::Hot);
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(LeadStatus::from_total(100), LeadStatus::Hot);
        assert_eq!(LeadStatus::from_total(80), LeadStatus::Hot);
        assert_eq!(LeadStatus::from_total(79), LeadStatus::Warm);
        assert_eq!(LeadStatus::from_total(40), LeadStatus::Warm);
        assert_eq!(LeadStatus::from_total(39), LeadStatus::Cold);
        assert_eq!(Confidence::from_coverage(80), Confidence::High);
        assert_eq!(Confidence::from_coverage(40), Confidence::Medium);
        assert_eq!(Confidence::from_coverage(30), Confidence::Low);
    }

    #[test]
    fn test_flat_record_contains_payload_and_score_fields() {
        let record = record_with(vec![techstack_result()]);
        let score = score_record(&record, &KnownAttributes::default());
        let row = record.to_flat_record(&score).unwrap();

        assert_eq!(row["domain"], "example.com");
        assert_eq!(row["tech_stack_search_provider"], "Elasticsearch");
        assert_eq!(row["score_total"], score.total);
        assert_eq!(row["lead_status"], score.status.as_str());
        assert!(!row.contains_key("traffic_monthly_visits"));
        assert_eq!(flat_record_key(&row), Some(record.domain.clone()));
    }

    fn arb_hiring() -> impl Strategy<Value = Option<HiringData>> {
        proptest::option::of((0u32..200, 0u32..200, 0u32..200, 0u32..500, 0u32..50).prop_map(
            |(executive, director, manager, individual, hits)| HiringData {
                total_openings: executive + director + manager + individual,
                tiers: SeniorityTiers {
                    executive,
                    director,
                    manager,
                    individual,
                },
                keyword_hits: BTreeMap::from([("search".to_string(), hits)]),
                relevant_roles: vec![],
            },
        ))
    }

    proptest! {
        #[test]
        fn prop_factors_and_total_stay_in_range(
            industry in proptest::option::of("[a-z ]{0,20}"),
            partners in proptest::collection::vec("[A-Za-z ]{1,12}", 0..8),
            search in proptest::option::of("[A-Za-z]{1,12}"),
            visits in proptest::option::of(any::<u64>()),
            revenue in proptest::option::of(0.0f64..1e13),
            market_cap in proptest::option::of(0.0f64..1e13),
            years in 0usize..10,
            hiring in arb_hiring(),
            themes in proptest::collection::vec("[a-z]{1,8}", 0..10),
            quotes in 0usize..50,
        ) {
            let attributes = ScoringAttributes {
                industry,
                technologies: partners.clone(),
                partner_technologies: partners,
                search_provider: search,
                monthly_visits: visits,
                bounce_rate: None,
                pages_per_visit: None,
                revenue,
                market_cap,
                revenue_history_years: years,
                hiring,
                themes,
                quote_count: quotes,
            };
            let score = score(&attributes);
            prop_assert!(score.total <= 100);
            prop_assert!(score.factors.fit <= 100);
            prop_assert!(score.factors.intent <= 100);
            prop_assert!(score.factors.value <= 100 && score.factors.value >= VALUE_FLOOR);
            prop_assert!(score.factors.displacement <= 100);
            prop_assert!(score.data_completeness <= 100);
        }
    }
}
