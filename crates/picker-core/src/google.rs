//! Google Sheets REST backend for the sheet store.
//!
//! Talks to the Sheets v4 `values` API with a static bearer token. Reads
//! retry transient failures (429 and server errors) with exponential
//! backoff; writes are sent exactly once so a reservation can never be
//! double-applied by the client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sheet::SheetStore;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_READ_ATTEMPTS: u32 = 3;
const READ_BACKOFF_BASE_MS: u64 = 250;
const READ_BACKOFF_CAP_MS: u64 = 2000;

/// The widest range we ever ask for; sheets here are narrow tables.
const FULL_RANGE: &str = "A1:ZZ";

/// Sheet store backed by the Google Sheets v4 REST API.
#[derive(Clone)]
pub struct GoogleSheetsStore {
    client: reqwest::Client,
    base_url: String,
    sheet_id: String,
    token: String,
}

impl std::fmt::Debug for GoogleSheetsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsStore")
            .field("base_url", &self.base_url)
            .field("sheet_id", &self.sheet_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl GoogleSheetsStore {
    /// Creates a store from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the sheet id or token is
    /// missing, or an internal error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let sheet_id = config
            .sheet_id
            .clone()
            .ok_or_else(|| Error::config("sheet id is not set"))?;
        let token = config
            .sheets_token
            .clone()
            .ok_or_else(|| Error::config("sheets token is not set"))?;

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.sheets_base_url().trim_end_matches('/').to_string(),
            sheet_id,
            token,
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{range}",
            self.base_url, self.sheet_id
        )
    }

    /// Fetches a range, retrying transient failures on this read-only call.
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: ValuesResponse = resp.json().await.map_err(|e| {
                        Error::data_source_with_source("invalid sheet values response", e)
                    })?;
                    return Ok(parsed
                        .values
                        .into_iter()
                        .map(|row| row.into_iter().map(cell_to_string).collect())
                        .collect());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if retryable && attempt < MAX_READ_ATTEMPTS {
                        tokio::time::sleep(read_backoff(attempt)).await;
                        continue;
                    }
                    let body = resp.text().await.unwrap_or_default();
                    return Err(Error::data_source(format!(
                        "sheet read failed (status={status}): {}",
                        error_message(&body)
                    )));
                }
                Err(err) => {
                    // Don't retry timeouts: failing fast keeps request
                    // workers from wedging on a slow sheet.
                    if err.is_timeout() {
                        return Err(Error::data_source_with_source(
                            "sheet read timed out",
                            err,
                        ));
                    }
                    if attempt < MAX_READ_ATTEMPTS {
                        tokio::time::sleep(read_backoff(attempt)).await;
                        continue;
                    }
                    return Err(Error::data_source_with_source("sheet read failed", err));
                }
            }
        }
    }
}

fn read_backoff(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let millis = READ_BACKOFF_BASE_MS
        .saturating_mul(2_u64.saturating_pow(exponent))
        .min(READ_BACKOFF_CAP_MS);
    Duration::from_millis(millis)
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Converts 1-based `(row, col)` coordinates to A1 notation.
fn a1_cell(row: u32, col: u32) -> String {
    let mut letters = String::new();
    let mut col = col;
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.insert(0, char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        col = (col - 1) / 26;
    }
    format!("{letters}{row}")
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn read_header(&self) -> Result<Vec<String>> {
        let rows = self.get_values("1:1").await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn read_rows(&self) -> Result<Vec<HashMap<String, String>>> {
        let mut rows = self.get_values(FULL_RANGE).await?.into_iter();
        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };
        Ok(rows
            .map(|row| {
                header
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        (name.trim().to_string(), row.get(i).cloned().unwrap_or_default())
                    })
                    .collect()
            })
            .collect())
    }

    async fn write_cell(&self, row: u32, col: u32, value: &str) -> Result<()> {
        let cell = a1_cell(row, col);
        let url = self.values_url(&cell);
        let body = serde_json::json!({ "values": [[value]] });

        // Single attempt: a retried write could double-apply a reservation
        // the store actually recorded.
        let response = self
            .client
            .put(&url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::update_with_source("sheet write failed", e))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(Error::update(format!(
            "sheet write to {cell} failed (status={status}): {}",
            error_message(&text)
        )))
    }
}
