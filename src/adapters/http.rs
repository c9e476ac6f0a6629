use crate::domain::model::SourceId;
use crate::utils::error::{EnrichError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("biz-enrich/", env!("CARGO_PKG_VERSION"));

/// 所有 adapter 共用的 HTTP client (連線池可共享)
pub fn build_client() -> Result<Client> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// 發送一次 GET 並解析 JSON。404 回傳 `Ok(None)`，由呼叫端決定其意義
pub async fn fetch_json<T: DeserializeOwned>(
    source: SourceId,
    request: RequestBuilder,
    timeout: Duration,
) -> Result<Option<T>> {
    let response = request.timeout(timeout).send().await?;
    let status = response.status();
    tracing::debug!(source = %source, status = %status, "provider response");

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(EnrichError::Provider {
            source_id: source.to_string(),
            message: format!("HTTP {}", status),
        });
    }

    let body = response.text().await?;
    let parsed = serde_json::from_str(&body)?;
    Ok(Some(parsed))
}

/// 一般來源把 404 視為錯誤
pub async fn fetch_required_json<T: DeserializeOwned>(
    source: SourceId,
    request: RequestBuilder,
    timeout: Duration,
) -> Result<T> {
    fetch_json(source, request, timeout)
        .await?
        .ok_or_else(|| EnrichError::Provider {
            source_id: source.to_string(),
            message: "HTTP 404 Not Found".to_string(),
        })
}

pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
