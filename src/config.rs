use crate::user_store::{MatchPool, RosterStrategy};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub spreadsheet_id: String,
    pub course_ids: Vec<String>,
    pub roster_strategy: RosterStrategy,
    pub match_pool: MatchPool,
    pub csv_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let spreadsheet_id = lookup("SPREADSHEET_ID")
            .filter(|id| !id.trim().is_empty())
            .context("SPREADSHEET_ID not found. Please set it in .env file or environment")?;

        let course_ids: Vec<String> = lookup("COURSE_IDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
        if course_ids.is_empty() {
            anyhow::bail!("COURSE_IDS is empty. Set it to a comma separated list of course ids");
        }

        let roster_strategy: RosterStrategy = match lookup("ROSTER_STRATEGY") {
            Some(value) => value.trim().parse().context("Invalid ROSTER_STRATEGY")?,
            None => RosterStrategy::default(),
        };
        let match_pool: MatchPool = match lookup("NAME_MATCH_POOL") {
            Some(value) => value.trim().parse().context("Invalid NAME_MATCH_POOL")?,
            None => MatchPool::default(),
        };

        let csv_dir = lookup("REPORT_CSV_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            course_ids,
            roster_strategy,
            match_pool,
            csv_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_unset() {
        let config = config_from(&[("SPREADSHEET_ID", "abc"), ("COURSE_IDS", " 1, 2 ,,3 ")]).unwrap();
        assert_eq!(config.spreadsheet_id, "abc");
        assert_eq!(config.course_ids, vec!["1", "2", "3"]);
        assert_eq!(config.roster_strategy, RosterStrategy::PerCourse);
        assert_eq!(config.match_pool, MatchPool::Mapping);
        assert!(config.csv_dir.is_none());
    }

    #[test]
    fn strategies_and_export_dir_are_read() {
        let config = config_from(&[
            ("SPREADSHEET_ID", "abc"),
            ("COURSE_IDS", "1"),
            ("ROSTER_STRATEGY", "sheet-cache"),
            ("NAME_MATCH_POOL", "self"),
            ("REPORT_CSV_DIR", "out"),
        ])
        .unwrap();
        assert_eq!(config.roster_strategy, RosterStrategy::SheetCache);
        assert_eq!(config.match_pool, MatchPool::SelfReferential);
        assert_eq!(config.csv_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn missing_required_values_fail() {
        assert!(config_from(&[("COURSE_IDS", "1")]).is_err());
        assert!(config_from(&[("SPREADSHEET_ID", "abc"), ("COURSE_IDS", " , ")]).is_err());
        assert!(config_from(&[
            ("SPREADSHEET_ID", "abc"),
            ("COURSE_IDS", "1"),
            ("ROSTER_STRATEGY", "nightly"),
        ])
        .is_err());
    }
}
