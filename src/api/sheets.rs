use super::http::GoogleHttp;
use crate::error::ApiError;
use crate::models::{UpdateValuesResponse, ValueRange, ValueRangeBody};
use crate::table::Table;
use reqwest::Method;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use tracing::info;

const API_BASE: &str = "https://sheets.googleapis.com/v4";

/// How the Sheets API treats written values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInputMode {
    /// Stored verbatim.
    Literal,
    /// Parsed as if typed into the sheet by a user (formulas, dates, numbers).
    Interpreted,
}

impl ValueInputMode {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ValueInputMode::Literal => "RAW",
            ValueInputMode::Interpreted => "USER_ENTERED",
        }
    }
}

impl FromStr for ValueInputMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(ValueInputMode::Literal),
            "interpreted" => Ok(ValueInputMode::Interpreted),
            other => Err(ApiError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for ValueInputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueInputMode::Literal => write!(f, "literal"),
            ValueInputMode::Interpreted => write!(f, "interpreted"),
        }
    }
}

/// Range-level access to Google Sheets.
pub trait SheetsApi {
    async fn get_values(&self, spreadsheet_id: &str, range: &str)
        -> Result<Vec<Vec<String>>, ApiError>;

    /// Overwrite `range` with `values`, returning the updated cell count.
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        mode: ValueInputMode,
    ) -> Result<u64, ApiError>;

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), ApiError>;

    async fn read_table(&self, spreadsheet_id: &str, range: &str) -> Result<Table, ApiError> {
        Ok(Table::from_values(self.get_values(spreadsheet_id, range).await?))
    }

    /// Write rows with a mode given by name. Unknown modes are rejected
    /// before any request is made.
    async fn write_data(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        mode: &str,
    ) -> Result<u64, ApiError> {
        let mode: ValueInputMode = mode.parse()?;
        let updated = self
            .update_values(spreadsheet_id, range, values, mode)
            .await?;
        info!(range, %mode, updated_cells = updated, "cells updated");
        Ok(updated)
    }
}

#[derive(Clone)]
pub struct SheetsClient {
    http: GoogleHttp,
}

impl SheetsClient {
    pub fn new(token: String) -> Self {
        Self {
            http: GoogleHttp::new(API_BASE, token),
        }
    }
}

impl SheetsApi for SheetsClient {
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        let path = format!(
            "/spreadsheets/{}/values/{}",
            spreadsheet_id,
            urlencoding::encode(range)
        );
        let response: ValueRange = self.http.get(&path, &[]).await?;
        Ok(response.values)
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        mode: ValueInputMode,
    ) -> Result<u64, ApiError> {
        let path = format!(
            "/spreadsheets/{}/values/{}",
            spreadsheet_id,
            urlencoding::encode(range)
        );
        let body = ValueRangeBody {
            range,
            major_dimension: "ROWS",
            values,
        };
        let response: UpdateValuesResponse = self
            .http
            .send_json(
                Method::PUT,
                &path,
                &[("valueInputOption", mode.as_api_str())],
                &body,
            )
            .await?;
        Ok(response.updated_cells)
    }

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), ApiError> {
        let path = format!("/spreadsheets/{}:batchUpdate", spreadsheet_id);
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        let _: serde_json::Value = self.http.send_json(Method::POST, &path, &[], &body).await?;
        info!(title, "added sheet");
        Ok(())
    }
}
