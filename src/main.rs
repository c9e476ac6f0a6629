use biz_enrich::core::scoring::score_record;
use biz_enrich::domain::model::{Domain, ProgressEvent};
use biz_enrich::utils::error::ErrorSeverity;
use biz_enrich::utils::monitor::SystemMonitor;
use biz_enrich::utils::{logger, validation::Validate};
use biz_enrich::{
    BatchCoordinator, BatchEntry, BatchOptions, CliConfig, EnrichConfig, EnrichError,
    EnrichRequest, KnownAttributes, LocalSink, Orchestrator, PersistenceSink, Result,
};
use clap::Parser;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌 (輸出到 stderr，stdout 保留給 JSON 結果)
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting biz-enrich CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Enrichment failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: CliConfig) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EnrichConfig::from_file(path)?,
        None => EnrichConfig::default(),
    };
    config.validate()?;

    let sources = cli.requested_sources()?;
    let input = load_input(&cli).await?;

    let orchestrator = Arc::new(Orchestrator::from_config(&config, None)?);
    tracing::info!(
        available = ?orchestrator.registry().available(),
        "🔌 sources configured"
    );

    let sink: Option<Arc<dyn PersistenceSink>> = cli.output.as_ref().map(|dir| {
        tracing::info!("📁 Writing records to: {}", dir);
        Arc::new(LocalSink::new(dir)) as Arc<dyn PersistenceSink>
    });

    let known = KnownAttributes {
        industry: cli.industry.clone(),
        ..Default::default()
    };

    let on_progress: Option<biz_enrich::core::ProgressCallback> = cli.verbose.then(|| {
        Arc::new(|event: ProgressEvent| {
            tracing::debug!(
                domain = %event.domain,
                source = %event.source,
                status = ?event.status,
                cached = event.cached,
                "progress"
            );
        }) as biz_enrich::core::ProgressCallback
    });

    let entries = if cli.company_name.is_some() || cli.ticker.is_some() {
        // 公司名稱 / ticker 提示只對單一網域有意義
        let domain = single_domain(&input)?;
        let request = EnrichRequest {
            sources,
            force_refresh: cli.force_refresh,
            company_name: cli.company_name.clone(),
            ticker: cli.ticker.clone(),
            on_progress,
        };
        let record = orchestrator.enrich(&domain, request).await?;
        let score = score_record(&record, &known);

        let mut error = None;
        if let Some(sink) = &sink {
            let row = record.to_flat_record(&score)?;
            if let Err(e) = sink.upsert(&record.domain, &row).await {
                tracing::warn!(domain = %record.domain, error = %e, "failed to persist record");
                error = Some(e.to_string());
            }
        }

        BTreeMap::from([(
            record.domain.to_string(),
            BatchEntry {
                record: Some(record),
                score: Some(score),
                error,
            },
        )])
    } else {
        let mut coordinator = BatchCoordinator::new(Arc::clone(&orchestrator), config.batch.clone())
            .with_monitor(SystemMonitor::new(cli.monitor));
        if let Some(sink) = sink {
            coordinator = coordinator.with_sink(sink);
        }

        let options = BatchOptions {
            concurrency: cli.concurrency,
            sources,
            force_refresh: cli.force_refresh,
            known,
            on_progress,
            on_domain_complete: Some(Arc::new(|done: usize, total: usize, domain: &Domain| {
                tracing::info!("✅ [{}/{}] {}", done, total, domain);
            })),
            ..Default::default()
        };

        coordinator
            .enrich_batch_json(&input, options)
            .await?
            .into_iter()
            .map(|(domain, entry)| (domain.to_string(), entry))
            .collect()
    };

    println!("{}", serde_json::to_string_pretty(&entries)?);
    tracing::info!("🎉 Enriched {} domain(s)", entries.len());
    Ok(())
}

/// `--input` 的 JSON 陣列加上命令列上的網域
async fn load_input(cli: &CliConfig) -> Result<Value> {
    let mut input = match &cli.input {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            serde_json::from_str::<Value>(&text)?
        }
        None => Value::Array(Vec::new()),
    };

    if let Value::Array(items) = &mut input {
        items.extend(cli.domains.iter().cloned().map(Value::from));
    }
    Ok(input)
}

fn single_domain(input: &Value) -> Result<String> {
    match input.as_array().map(Vec::as_slice) {
        Some([Value::String(domain)]) => Ok(domain.clone()),
        _ => Err(EnrichError::Validation {
            message: "--company-name and --ticker require exactly one domain".to_string(),
        }),
    }
}
