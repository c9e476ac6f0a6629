use crate::domain::model::SourceId;
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "biz-enrich")]
#[command(about = "Enrich company domains from external data providers and score them")]
pub struct CliConfig {
    /// Domains to enrich (scheme and path are stripped)
    pub domains: Vec<String>,

    #[arg(long, help = "JSON file containing an array of domains")]
    pub input: Option<String>,

    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Sources to query (default: all)")]
    pub sources: Vec<String>,

    #[arg(long, help = "Bypass the cache and fetch fresh data")]
    pub force_refresh: bool,

    #[arg(long)]
    pub company_name: Option<String>,

    #[arg(long)]
    pub ticker: Option<String>,

    #[arg(long, help = "Industry / vertical already known for the company")]
    pub industry: Option<String>,

    #[arg(long, help = "Subjects enriched concurrently per batch")]
    pub concurrency: Option<usize>,

    #[arg(long, help = "Directory where one JSON record per domain is written")]
    pub output: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Log process memory usage per batch")]
    pub monitor: bool,
}

impl CliConfig {
    /// 解析 `--sources`；空清單表示全部來源
    pub fn requested_sources(&self) -> Result<Option<Vec<SourceId>>> {
        if self.sources.is_empty() {
            return Ok(None);
        }
        self.sources
            .iter()
            .map(|name| name.parse::<SourceId>())
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.domains.is_empty() && self.input.is_none() {
            return Err(EnrichError::MissingConfig {
                field: "domains or --input".to_string(),
            });
        }
        if let Some(input) = &self.input {
            validate_path("input", input)?;
        }
        if let Some(output) = &self.output {
            validate_path("output", output)?;
        }
        self.requested_sources()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_arguments() {
        let config = CliConfig::parse_from([
            "biz-enrich",
            "example.com",
            "shop.example.org",
            "--sources",
            "traffic,techstack",
            "--concurrency",
            "4",
            "--force-refresh",
        ]);

        assert_eq!(config.domains, vec!["example.com", "shop.example.org"]);
        assert!(config.force_refresh);
        assert_eq!(config.concurrency, Some(4));
        assert_eq!(
            config.requested_sources().unwrap(),
            Some(vec![SourceId::Traffic, SourceId::TechStack])
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_requires_input() {
        let config = CliConfig::parse_from(["biz-enrich"]);
        assert!(config.validate().is_err());

        let config = CliConfig::parse_from(["biz-enrich", "example.com", "--sources", "weather"]);
        assert!(config.validate().is_err());
    }
}
