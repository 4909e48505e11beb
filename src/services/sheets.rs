// src/services/sheets.rs

//! Google Sheets row fetcher.
//!
//! Reads the whole response sheet through the Sheets v4 REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{GoogleCredentials, Sheet, SheetsConfig};
use crate::services::RowFetcher;
use crate::utils::http::{check_status, endpoint};

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range holds no data
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Row fetcher backed by the Google Sheets API.
pub struct SheetsClient {
    client: Client,
    config: SheetsConfig,
    credentials: GoogleCredentials,
}

impl SheetsClient {
    pub fn new(client: Client, config: &SheetsConfig, credentials: &GoogleCredentials) -> Self {
        Self {
            client,
            config: config.clone(),
            credentials: credentials.clone(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.credentials.access_token)
            .header("x-goog-user-project", &self.credentials.project_id)
    }

    /// Title of the first sheet, used when no sheet name is configured.
    async fn first_sheet_title(&self) -> Result<String> {
        let url = endpoint(
            &self.config.api_base,
            &["v4", "spreadsheets", self.config.spreadsheet_id.as_str()],
        )?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);
        let response = check_status(self.authorized(request).send().await?, AppError::fetch).await?;
        let metadata: SpreadsheetMetadata = response.json().await?;

        metadata
            .sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| {
                AppError::fetch(format!(
                    "spreadsheet {} has no sheets",
                    self.config.spreadsheet_id
                ))
            })
    }

    async fn read_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = endpoint(
            &self.config.api_base,
            &["v4", "spreadsheets", self.config.spreadsheet_id.as_str(), "values", range],
        )?;
        let request = self.client.get(url);
        let response = check_status(self.authorized(request).send().await?, AppError::fetch).await?;
        let body: ValueRange = response.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|line| line.into_iter().map(cell_text).collect())
            .collect())
    }
}

/// Formatted cells arrive as strings; anything else is rendered as JSON.
fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RowFetcher for SheetsClient {
    async fn fetch(&self) -> Result<Sheet> {
        let range = match &self.config.sheet_name {
            Some(name) => name.clone(),
            None => self.first_sheet_title().await?,
        };
        let values = self.read_values(&range).await?;
        if values.is_empty() {
            log::warn!("No responses found in sheet '{}'", range);
        }
        Ok(Sheet::from_values(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(Value::from("Ana")), "Ana");
        assert_eq!(cell_text(Value::from(123456)), "123456");
        assert_eq!(cell_text(Value::Null), "");
    }

    #[test]
    fn test_value_range_without_values() {
        let body: ValueRange = serde_json::from_str(r#"{"range":"Sheet1!A1:Z1000"}"#).unwrap();
        assert!(body.values.is_empty());
    }
}
