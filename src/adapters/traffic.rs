use crate::adapters::http::{endpoint, fetch_required_json};
use crate::adapters::{into_source_result, require_credential};
use crate::config::ProviderConfig;
use crate::domain::model::{Domain, SourceId, SourcePayload, SourceResult};
use crate::domain::payload::{CountryShare, TrafficData, TrafficSources};
use crate::domain::ports::{EnrichOptions, SourceAdapter};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const MAX_COUNTRIES: usize = 5;

#[derive(Debug, Deserialize)]
struct TrafficResponse {
    #[serde(default)]
    visits: Option<f64>,
    #[serde(default)]
    bounce_rate: Option<f64>,
    #[serde(default)]
    pages_per_visit: Option<f64>,
    #[serde(default)]
    average_visit_duration: Option<f64>,
    #[serde(default)]
    traffic_sources: HashMap<String, f64>,
    #[serde(default)]
    top_country_shares: Vec<CountryShareResponse>,
}

#[derive(Debug, Deserialize)]
struct CountryShareResponse {
    country_code: String,
    share: f64,
}

/// 網站流量與互動指標
#[derive(Debug, Clone)]
pub struct TrafficAdapter {
    client: Client,
    config: ProviderConfig,
}

impl TrafficAdapter {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    async fn fetch(&self, domain: &Domain) -> Result<TrafficData> {
        let api_key = require_credential(SourceId::Traffic, &self.config)?;
        let url = endpoint(
            &self.config.base_url,
            &format!("/v1/website/{}/overview", domain),
        );

        let request = self.client.get(url).header("api-key", api_key);
        let response: TrafficResponse = fetch_required_json(
            SourceId::Traffic,
            request,
            self.config.timeout(SourceId::Traffic),
        )
        .await?;

        Ok(normalize(response))
    }
}

#[async_trait]
impl SourceAdapter for TrafficAdapter {
    fn id(&self) -> SourceId {
        SourceId::Traffic
    }

    fn is_available(&self) -> bool {
        self.config.credential().is_some()
    }

    async fn enrich(&self, domain: &Domain, _options: &EnrichOptions) -> SourceResult {
        let outcome = self.fetch(domain).await.map(SourcePayload::Traffic);
        into_source_result(SourceId::Traffic, domain, outcome)
    }
}

fn normalize(response: TrafficResponse) -> TrafficData {
    let bounce_rate = response
        .bounce_rate
        .map(|rate| if rate > 1.0 { rate / 100.0 } else { rate })
        .map(|rate| rate.clamp(0.0, 1.0));

    let mut top_countries: Vec<CountryShare> = response
        .top_country_shares
        .into_iter()
        .map(|c| CountryShare {
            country: c.country_code.to_uppercase(),
            share: c.share,
        })
        .collect();
    top_countries.sort_by(|a, b| b.share.total_cmp(&a.share));
    top_countries.truncate(MAX_COUNTRIES);

    TrafficData {
        monthly_visits: response
            .visits
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64),
        bounce_rate,
        pages_per_visit: response.pages_per_visit,
        avg_visit_duration_secs: response.average_visit_duration,
        traffic_sources: normalize_sources(&response.traffic_sources),
        top_countries,
    }
}

/// 來源鍵名不固定 (Direct / direct / Paid Search ...)，數值可能是比例或百分比
fn normalize_sources(raw: &HashMap<String, f64>) -> TrafficSources {
    let mut sources = TrafficSources::default();
    for (key, value) in raw {
        let key = key.to_lowercase();
        let slot = if key.contains("direct") {
            &mut sources.direct
        } else if key.contains("paid") || key.contains("display") {
            &mut sources.paid
        } else if key.contains("search") {
            &mut sources.search
        } else if key.contains("referral") {
            &mut sources.referral
        } else if key.contains("social") {
            &mut sources.social
        } else if key.contains("mail") {
            &mut sources.mail
        } else {
            continue;
        };
        *slot += value;
    }

    let total = sources.direct
        + sources.search
        + sources.referral
        + sources.social
        + sources.paid
        + sources.mail;
    if total > 0.0 && total <= 1.01 {
        sources.direct *= 100.0;
        sources.search *= 100.0;
        sources.referral *= 100.0;
        sources.social *= 100.0;
        sources.paid *= 100.0;
        sources.mail *= 100.0;
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::build_client;
    use httpmock::prelude::*;

    fn adapter(base_url: &str, api_key: Option<&str>) -> TrafficAdapter {
        let mut config = ProviderConfig::new(base_url);
        config.api_key = api_key.map(str::to_string);
        TrafficAdapter::new(build_client().unwrap(), config)
    }

    #[tokio::test]
    async fn test_enrich_normalizes_traffic_payload() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/website/example.com/overview")
                .header("api-key", "secret");
            then.status(200).json_body(serde_json::json!({
                "visits": 2500000.4,
                "bounce_rate": 45.0,
                "pages_per_visit": 3.1,
                "average_visit_duration": 182.0,
                "traffic_sources": {"Direct": 0.4, "Search": 0.35, "Paid Search": 0.05, "Social": 0.2},
                "top_country_shares": [
                    {"country_code": "gb", "share": 0.1},
                    {"country_code": "us", "share": 0.6}
                ]
            }));
        });

        let domain = Domain::parse("example.com").unwrap();
        let result = adapter(&server.base_url(), Some("secret"))
            .enrich(&domain, &EnrichOptions::default())
            .await;

        api_mock.assert();
        assert!(result.success);
        let Some(SourcePayload::Traffic(data)) = result.data else {
            panic!("expected traffic payload");
        };
        assert_eq!(data.monthly_visits, Some(2_500_000));
        assert_eq!(data.bounce_rate, Some(0.45));
        assert!((data.traffic_sources.direct - 40.0).abs() < 1e-9);
        assert!((data.traffic_sources.paid - 5.0).abs() < 1e-9);
        assert_eq!(data.top_countries[0].country, "US");
    }

    #[tokio::test]
    async fn test_enrich_reports_http_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/website/example.com/overview");
            then.status(503);
        });

        let domain = Domain::parse("example.com").unwrap();
        let result = adapter(&server.base_url(), Some("secret"))
            .enrich(&domain, &EnrichOptions::default())
            .await;

        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("503"));
    }

    #[test]
    fn test_availability_follows_credentials() {
        assert!(adapter("http://localhost", Some("key")).is_available());
        assert!(!adapter("http://localhost", None).is_available());
        assert!(!adapter("http://localhost", Some("${TRAFFIC_API_KEY}")).is_available());
    }
}
