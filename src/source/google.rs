use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{CellRange, SheetSource};
use crate::error::SourceError;
use crate::schema::CellGrid;

const DEFAULT_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Google Sheets `values.get` over REST. Obtaining the OAuth access token is
/// the caller's job.
#[derive(Debug, Clone)]
pub struct GoogleSheetsSource {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    range: CellRange,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsSource {
    pub fn new(access_token: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: access_token.into(),
            range: CellRange::default(),
        })
    }

    /// Point at a different API base, e.g. a local emulator.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_range(mut self, range: CellRange) -> Self {
        self.range = range;
        self
    }

    fn values_url(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Url, SourceError> {
        // A1 notation quotes sheet names with embedded quotes doubled.
        let a1 = format!("'{}'!{}", sheet_name.replace('\'', "''"), self.range);
        let mut url = Url::parse(&self.endpoint)
            .map_err(|err| SourceError::Response(format!("invalid endpoint '{}': {err}", self.endpoint)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Response(format!("endpoint '{}' cannot carry a path", self.endpoint)))?
            .pop_if_empty()
            .push(spreadsheet_id)
            .push("values")
            .push(&a1);
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn fetch(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<CellGrid, SourceError> {
        let url = self.values_url(spreadsheet_id, sheet_name)?;
        tracing::debug!(spreadsheet = spreadsheet_id, sheet = sheet_name, "fetching sheet values");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unauthorized {
                    sheet: sheet_name.to_string(),
                    message: body,
                },
                StatusCode::NOT_FOUND => SourceError::NotFound {
                    spreadsheet: spreadsheet_id.to_string(),
                    sheet: sheet_name.to_string(),
                },
                // An unknown sheet name surfaces as a range parse failure.
                StatusCode::BAD_REQUEST if body.contains("Unable to parse range") => {
                    SourceError::NotFound {
                        spreadsheet: spreadsheet_id.to_string(),
                        sheet: sheet_name.to_string(),
                    }
                }
                other => SourceError::Response(format!("{other}: {body}")),
            });
        }

        let range: ValueRange = response.json().await?;
        Ok(grid_from_values(range.values))
    }
}

fn grid_from_values(values: Vec<Vec<Value>>) -> CellGrid {
    CellGrid::new(
        values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect(),
    )
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
