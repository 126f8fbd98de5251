mod api;
mod auth;
mod config;
mod error;
mod export;
mod models;
mod report;
mod table;
#[cfg(test)]
mod testing;
mod tracker;
mod user_store;

use anyhow::{Context, Result};
use api::{ClassroomClient, SheetsClient};
use auth::{GoogleService, TokenProvider};
use config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracker::Tracker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Authorize both services before any data is fetched
    let classroom_token = TokenProvider::for_service(GoogleService::Classroom)
        .access_token()
        .await
        .context("Failed to authorize Google Classroom access")?;
    let sheets_token = TokenProvider::for_service(GoogleService::Sheets)
        .access_token()
        .await
        .context("Failed to authorize Google Sheets access")?;

    let tracker = Tracker::new(
        ClassroomClient::new(classroom_token),
        SheetsClient::new(sheets_token),
        config.spreadsheet_id,
    )
    .with_roster_strategy(config.roster_strategy)
    .with_match_pool(config.match_pool)
    .with_csv_export(config.csv_dir);

    let uploaded = tracker.upload_all_submissions(&config.course_ids).await?;
    info!(courses = uploaded, "sync complete");

    Ok(())
}
