use anyhow::Result;
use biz_enrich::config::ProvidersConfig;
use biz_enrich::core::LeadStatus;
use biz_enrich::{
    BatchCoordinator, BatchOptions, CompanyHints, Domain, EnrichConfig, EnrichError,
    KnownAttributes, LocalSink, Orchestrator, SourceId,
};
use biz_enrich::domain::payload::FinancialOutcome;
use std::collections::HashMap;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn coordinator_for(server: &MockServer) -> BatchCoordinator {
    let config = EnrichConfig {
        providers: ProvidersConfig::all_at(&server.base_url(), "test-key"),
        ..EnrichConfig::default()
    };
    let orchestrator = Orchestrator::from_config(&config, None).unwrap();
    BatchCoordinator::new(Arc::new(orchestrator), config.batch)
}

fn traffic_options() -> BatchOptions {
    BatchOptions {
        sources: Some(vec![SourceId::Traffic]),
        pacing: Some(Duration::from_millis(10)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_batch_scores_and_persists_each_domain() -> Result<()> {
    let server = MockServer::start();
    let traffic = server.mock(|when, then| {
        when.method(GET).path_contains("/overview");
        then.status(200)
            .json_body(json!({"visits": 25_000_000, "bounce_rate": 0.5}));
    });

    let temp_dir = TempDir::new()?;
    let sink = LocalSink::new(temp_dir.path());
    let coordinator = coordinator_for(&server).with_sink(Arc::new(sink.clone()));

    let options = BatchOptions {
        concurrency: Some(2),
        known: KnownAttributes {
            industry: Some("Retail".to_string()),
            ..Default::default()
        },
        ..traffic_options()
    };
    let domains: Vec<String> = ["alpha.com", "beta.com", "gamma.com"]
        .iter()
        .map(|d| d.to_string())
        .collect();

    let entries = coordinator.enrich_batch(&domains, options).await?;

    assert_eq!(traffic.hits(), 3);
    assert_eq!(entries.len(), 3);

    for domain in &domains {
        let domain = Domain::parse(domain)?;
        let entry = &entries[&domain];
        assert!(entry.error.is_none());

        let record = entry.record.as_ref().unwrap();
        assert_eq!(record.sources_completed, vec![SourceId::Traffic]);

        let score = entry.score.as_ref().unwrap();
        assert_eq!(score.factors.fit, 60);
        assert_eq!(score.factors.value, 45);
        assert_eq!(score.status, LeadStatus::Cold);

        let written = std::fs::read_to_string(sink.path_for(&domain))?;
        let row: serde_json::Value = serde_json::from_str(&written)?;
        assert_eq!(row["domain"], domain.as_str());
        assert_eq!(row["traffic_monthly_visits"], 25_000_000);
        assert_eq!(row["score_total"], score.total);
    }

    Ok(())
}

#[test]
fn test_empty_batch_is_a_noop() {
    let server = MockServer::start();
    let coordinator = coordinator_for(&server);
    let entries = tokio_test::block_on(coordinator.enrich_batch(&[], traffic_options()));
    assert!(entries.unwrap().is_empty());
}

#[tokio::test]
async fn test_one_failing_domain_does_not_abort_batch() {
    let server = MockServer::start();
    let ok = server.mock(|when, then| {
        when.method(GET).path("/v1/website/good.com/overview");
        then.status(200).json_body(json!({"visits": 1000}));
    });
    let broken = server.mock(|when, then| {
        when.method(GET).path("/v1/website/broken.com/overview");
        then.status(500);
    });

    let domains = vec!["good.com".to_string(), "broken.com".to_string()];
    let entries = coordinator_for(&server)
        .enrich_batch(&domains, traffic_options())
        .await
        .unwrap();

    ok.assert();
    broken.assert();

    let good = entries[&Domain::parse("good.com").unwrap()].record.as_ref().unwrap();
    assert_eq!(good.data_completeness, 100);
    let bad = entries[&Domain::parse("broken.com").unwrap()].record.as_ref().unwrap();
    assert_eq!(bad.data_completeness, 0);
    assert_eq!(bad.sources_failed, vec![SourceId::Traffic]);
}

#[tokio::test]
async fn test_invalid_batches_are_rejected_before_any_request() {
    let server = MockServer::start();
    let traffic = server.mock(|when, then| {
        when.method(GET).path_contains("/overview");
        then.status(200).json_body(json!({}));
    });
    let coordinator = coordinator_for(&server);

    let oversized: Vec<String> = (0..101).map(|i| format!("company{}.com", i)).collect();
    let err = coordinator
        .enrich_batch(&oversized, traffic_options())
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::BatchTooLarge { size: 101, .. }));

    let malformed = vec!["ok.com".to_string(), "no spaces.com".to_string()];
    let err = coordinator
        .enrich_batch(&malformed, traffic_options())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no spaces.com"));

    let err = coordinator
        .enrich_batch_json(&json!("ok.com"), traffic_options())
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::Validation { .. }));

    assert_eq!(traffic.hits(), 0);
}

#[tokio::test]
async fn test_requested_concurrency_is_clamped() {
    let server = MockServer::start();
    let traffic = server.mock(|when, then| {
        when.method(GET).path_contains("/overview");
        then.status(200).json_body(json!({"visits": 10}));
    });

    let domains: Vec<String> = (0..4).map(|i| format!("site{}.io", i)).collect();
    let options = BatchOptions {
        concurrency: Some(0),
        ..traffic_options()
    };
    let entries = coordinator_for(&server)
        .enrich_batch(&domains, options)
        .await
        .unwrap();

    assert_eq!(entries.len(), 4);
    assert_eq!(traffic.hits(), 4);
}

#[tokio::test]
async fn test_per_domain_hints_reach_the_financials_provider() {
    let server = MockServer::start();
    let acme = server.mock(|when, then| {
        when.method(GET).path("/api/v3/profile-summary/ACME");
        then.status(200)
            .json_body(json!({"symbol": "ACME", "revenue": 2_000_000_000.0, "history": []}));
    });
    let globex = server.mock(|when, then| {
        when.method(GET).path("/api/v3/profile-summary/GBX");
        then.status(200)
            .json_body(json!({"symbol": "GBX", "revenue": 50_000_000.0, "history": []}));
    });

    let acme_domain = Domain::parse("acme.com").unwrap();
    let globex_domain = Domain::parse("globex.com").unwrap();
    let private_domain = Domain::parse("private-co.com").unwrap();

    let hints = HashMap::from([
        (
            acme_domain.clone(),
            CompanyHints {
                ticker: Some("ACME".to_string()),
                ..Default::default()
            },
        ),
        (
            globex_domain.clone(),
            CompanyHints {
                company_name: Some("Globex".to_string()),
                ticker: Some("gbx".to_string()),
            },
        ),
    ]);
    let options = BatchOptions {
        sources: Some(vec![SourceId::Financials]),
        pacing: Some(Duration::ZERO),
        hints_by_domain: hints,
        ..Default::default()
    };
    let domains = vec![
        "acme.com".to_string(),
        "globex.com".to_string(),
        "private-co.com".to_string(),
    ];

    let entries = coordinator_for(&server)
        .enrich_batch(&domains, options)
        .await
        .unwrap();

    acme.assert();
    globex.assert();

    let outcome_of = |domain: &Domain| {
        entries[domain]
            .record
            .as_ref()
            .and_then(|r| r.financials())
            .map(|f| f.outcome.clone())
    };
    assert!(matches!(outcome_of(&acme_domain), Some(FinancialOutcome::Public(_))));
    assert!(matches!(outcome_of(&globex_domain), Some(FinancialOutcome::Public(_))));
    assert_eq!(outcome_of(&private_domain), Some(FinancialOutcome::NotPublic));
}
