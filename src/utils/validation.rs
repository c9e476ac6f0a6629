use crate::utils::error::{EnrichError, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// 單一 DNS label：英數字與連字號，不可以連字號開頭或結尾
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

static TLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]{2,63}$").unwrap());

pub const MAX_DOMAIN_LENGTH: usize = 253;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 將使用者輸入正規化為裸網域 (小寫、無 scheme / path / port / www.)
///
/// Idempotent: `sanitize_domain(&sanitize_domain(x)) == sanitize_domain(x)`.
pub fn sanitize_domain(input: &str) -> String {
    let mut current = sanitize_once(input);
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn sanitize_once(input: &str) -> String {
    let lowered = input.trim().to_lowercase();

    let without_scheme = match lowered.find("://") {
        Some(idx) => &lowered[idx + 3..],
        None => lowered.as_str(),
    };

    let host_part = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_part = host_part.rsplit('@').next().unwrap_or_default();
    let host_part = host_part.split(':').next().unwrap_or_default();

    let mut host = host_part.trim_matches(|c: char| c == '.' || c.is_whitespace());
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }

    host.to_string()
}

/// 驗證已正規化的網域是否符合 label 規則
pub fn validate_domain(domain: &str) -> Result<()> {
    let invalid = |reason: &str| EnrichError::InvalidDomain {
        input: domain.to_string(),
        reason: reason.to_string(),
    };

    if domain.is_empty() {
        return Err(invalid("domain is empty"));
    }
    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(invalid("domain exceeds 253 characters"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid("domain needs at least two labels"));
    }

    for label in &labels {
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        if !LABEL_RE.is_match(label) {
            return Err(invalid(&format!("invalid label '{}'", label)));
        }
    }

    if let Some(tld) = labels.last() {
        if !TLD_RE.is_match(tld) {
            return Err(invalid("top-level label must be alphabetic and at least 2 characters"));
        }
    }

    Ok(())
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EnrichError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EnrichError::InvalidConfigValue {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EnrichError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(EnrichError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EnrichError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EnrichError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EnrichError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
