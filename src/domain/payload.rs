//! Provider-agnostic payload shapes produced by the source adapters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficData {
    pub monthly_visits: Option<u64>,
    /// 0.0 - 1.0
    pub bounce_rate: Option<f64>,
    pub pages_per_visit: Option<f64>,
    pub avg_visit_duration_secs: Option<f64>,
    pub traffic_sources: TrafficSources,
    pub top_countries: Vec<CountryShare>,
}

/// 流量來源百分比 (0 - 100)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficSources {
    pub direct: f64,
    pub search: f64,
    pub referral: f64,
    pub social: f64,
    pub paid: f64,
    pub mail: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryShare {
    pub country: String,
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechStackData {
    pub technologies: Vec<Technology>,
    pub partner_technologies: Vec<String>,
    pub cms: Option<String>,
    pub ecommerce_platform: Option<String>,
    pub search_provider: Option<String>,
    pub analytics_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialData {
    pub ticker: Option<String>,
    pub outcome: FinancialOutcome,
}

/// 上市公司有財務摘要；找不到 ticker 是正常結果，不是錯誤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum FinancialOutcome {
    Public(FinancialSummary),
    NotPublic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub revenue: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub market_cap: Option<f64>,
    pub history: Vec<YearlyFinancials>,
    pub analyst: Option<AnalystSentiment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyFinancials {
    pub year: i32,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystSentiment {
    pub rating: Option<String>,
    pub target_price: Option<f64>,
    pub analyst_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilingsData {
    pub cik: Option<String>,
    pub company_name: Option<String>,
    pub filings: Vec<Filing>,
    pub latest_annual_report: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    pub form: String,
    pub filed_at: Option<NaiveDate>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HiringData {
    pub total_openings: u32,
    pub tiers: SeniorityTiers,
    pub keyword_hits: BTreeMap<String, u32>,
    pub relevant_roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeniorityTiers {
    pub executive: u32,
    pub director: u32,
    pub manager: u32,
    pub individual: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalsData {
    pub query: String,
    pub quotes: Vec<Quote>,
    pub themes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub theme: String,
}
