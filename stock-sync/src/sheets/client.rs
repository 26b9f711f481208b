//! HTTP transport for the spreadsheet values API

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use tokio::sync::Mutex;

use super::auth::{Credentials, ensure_valid};
use super::models::{BatchUpdateRequest, CellWrite, CommitResult, ValueRangeResponse};
use super::retry::{RequestError, RetryConfig, with_retry};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Remote table operations the reconciliation core relies on
///
/// Ranges follow `"{label}!{col}:{col}"` or `"{label}!1:1"`.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// Read a range as rows of cell strings; trailing empty cells are omitted
    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Apply every write in a single bulk request
    async fn batch_update(&self, writes: &[CellWrite]) -> Result<CommitResult>;
}

/// Sheets v4 client bound to one spreadsheet
pub struct SheetsClient<C: Credentials> {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    credentials: Mutex<C>,
    retry: RetryConfig,
}

impl<C: Credentials> SheetsClient<C> {
    pub fn new(spreadsheet_id: impl Into<String>, credentials: C, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            credentials: Mutex::new(credentials),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Access token, refreshed first if needed
    async fn bearer(&self) -> Result<String> {
        let mut creds = self.credentials.lock().await;
        ensure_valid(&mut *creds).await?;
        creds
            .access_token()
            .map(str::to_string)
            .context("Credentials have no access token")
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.base_url,
            self.spreadsheet_id,
            urlencoding::encode(range)
        )
    }

    fn batch_update_url(&self) -> String {
        format!("{}/{}/values:batchUpdate", self.base_url, self.spreadsheet_id)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RequestError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Render a JSON cell the way the API's formatted values read
fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl<C: Credentials> RemoteTable for SheetsClient<C> {
    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let token = self.bearer().await?;
        let url = self.values_url(range);
        debug!("GET {}", range);

        let (http, url, token) = (&self.http, url.as_str(), token.as_str());

        let response = with_retry(&self.retry, "values.get", || async move {
            let response = http.get(url).bearer_auth(token).send().await?;
            let response = check_status(response).await?;
            Ok::<_, RequestError>(response.json::<ValueRangeResponse>().await?)
        })
        .await
        .with_context(|| format!("Failed to read range {}", range))?;

        Ok(response
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn batch_update(&self, writes: &[CellWrite]) -> Result<CommitResult> {
        let token = self.bearer().await?;
        let url = self.batch_update_url();
        let body = BatchUpdateRequest::user_entered(writes);
        debug!("POST values:batchUpdate ({} cells)", writes.len());

        let (http, url, token, body) = (&self.http, url.as_str(), token.as_str(), &body);

        with_retry(&self.retry, "values.batchUpdate", || async move {
            let response = http.post(url).bearer_auth(token).json(body).send().await?;
            let response = check_status(response).await?;
            Ok::<_, RequestError>(response.json::<CommitResult>().await?)
        })
        .await
        .context("Failed to commit cell updates")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticToken;

    #[async_trait]
    impl Credentials for StaticToken {
        fn valid(&self) -> bool {
            true
        }
        fn expired(&self) -> bool {
            false
        }
        fn refresh_token(&self) -> Option<&str> {
            None
        }
        fn access_token(&self) -> Option<&str> {
            Some("static")
        }
        async fn refresh(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_values_url_encodes_range() {
        let client = SheetsClient::new("sheet-id", StaticToken, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.values_url("Stock 2024!A:A"),
            format!("{}/sheet-id/values/Stock%202024%21A%3AA", SHEETS_API_BASE)
        );
        assert_eq!(
            client.batch_update_url(),
            format!("{}/sheet-id/values:batchUpdate", SHEETS_API_BASE)
        );
    }

    #[test]
    fn test_base_url_override() {
        let client = SheetsClient::new("id", StaticToken, Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9000");
        assert_eq!(client.values_url("S!1:1"), "http://localhost:9000/id/values/S%211%3A1");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&json!("500g")), "500g");
        assert_eq!(cell_to_string(&json!(12)), "12");
        assert_eq!(cell_to_string(&json!(null)), "");
    }

    #[tokio::test]
    async fn test_bearer_uses_credentials() {
        let client = SheetsClient::new("id", StaticToken, Duration::from_secs(5)).unwrap();
        assert_eq!(client.bearer().await.unwrap(), "static");
    }
}
