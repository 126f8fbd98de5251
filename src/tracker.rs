use crate::api::{ClassroomApi, SheetsApi};
use crate::export;
use crate::models::{Course, ResolvedSubmissionRow};
use crate::report;
use crate::table::Table;
use crate::user_store::{MatchPool, RosterStrategy, UserStore};
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Builds per-course submission reports and uploads them to a spreadsheet,
/// one sheet per course.
pub struct Tracker<C, S> {
    classroom: C,
    sheets: S,
    spreadsheet_id: String,
    roster_strategy: RosterStrategy,
    match_pool: MatchPool,
    csv_dir: Option<PathBuf>,
}

impl<C: ClassroomApi, S: SheetsApi> Tracker<C, S> {
    pub fn new(classroom: C, sheets: S, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            classroom,
            sheets,
            spreadsheet_id: spreadsheet_id.into(),
            roster_strategy: RosterStrategy::default(),
            match_pool: MatchPool::default(),
            csv_dir: None,
        }
    }

    pub fn with_roster_strategy(mut self, strategy: RosterStrategy) -> Self {
        self.roster_strategy = strategy;
        self
    }

    pub fn with_match_pool(mut self, pool: MatchPool) -> Self {
        self.match_pool = pool;
        self
    }

    pub fn with_csv_export(mut self, dir: Option<PathBuf>) -> Self {
        self.csv_dir = dir;
        self
    }

    /// Upload the submissions report for every listed course. Returns the
    /// number of courses uploaded.
    pub async fn upload_all_submissions(&self, course_ids: &[String]) -> Result<usize> {
        let courses: IndexMap<String, Course> = self
            .classroom
            .list_courses()
            .await
            .context("Failed to fetch courses")?
            .into_iter()
            .map(|c| (c.course_id.clone(), c))
            .collect();

        let requested: IndexSet<&str> = course_ids.iter().map(String::as_str).collect();
        for course_id in &requested {
            let course = courses
                .get(*course_id)
                .with_context(|| format!("Course {} not found", course_id))?;
            self.upload_course(course).await?;
        }

        Ok(requested.len())
    }

    async fn upload_course(&self, course: &Course) -> Result<()> {
        let name = course.course_name.as_str();
        info!(course_id = %course.course_id, course = name, "syncing course");

        self.ensure_sheet(name).await?;

        let table = self.get_submissions(&course.course_id).await?;
        if table.is_empty() {
            warn!(course = name, "no submissions found");
        }
        let updated = self
            .sheets
            .write_data(&self.spreadsheet_id, name, &table.to_values(), "interpreted")
            .await
            .with_context(|| format!("Failed to upload submissions for {}", name))?;
        info!(course = name, updated_cells = updated, "uploaded submissions");

        if let Some(dir) = &self.csv_dir {
            let path = export::export_to_csv(&table, name, dir)?;
            info!(path = %path.display(), "exported CSV snapshot");
        }
        Ok(())
    }

    /// Create the course sheet if reading it reports a missing range.
    async fn ensure_sheet(&self, title: &str) -> Result<()> {
        match self.sheets.get_values(&self.spreadsheet_id, title).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_missing_range() => {
                info!(title, "sheet not found, creating it");
                self.sheets
                    .add_sheet(&self.spreadsheet_id, title)
                    .await
                    .with_context(|| format!("Failed to add sheet {}", title))
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read sheet {}", title)),
        }
    }

    /// Build the submissions report for one course: one row per student and
    /// metric, one column per coursework item.
    pub async fn get_submissions(&self, course_id: &str) -> Result<Table> {
        let courseworks = self
            .classroom
            .list_courseworks(course_id)
            .await
            .with_context(|| format!("Failed to fetch coursework for course {}", course_id))?;
        debug!(course_id, count = courseworks.len(), "retrieved courseworks");

        let mut store = UserStore::load(
            &self.classroom,
            &self.sheets,
            &self.spreadsheet_id,
            course_id,
            self.roster_strategy,
            self.match_pool,
        )
        .await?;

        let mut rows = Vec::new();
        for coursework in &courseworks {
            let submissions = self
                .classroom
                .list_submissions(course_id, &coursework.coursework_id)
                .await
                .with_context(|| {
                    format!("Failed to fetch submissions for {}", coursework.coursework_name)
                })?;

            let user_ids: Vec<String> = submissions.iter().map(|s| s.user_id.clone()).collect();
            let names = store.resolve_names(&user_ids).await?;
            let emails = store.resolve_emails(&user_ids).await?;
            let groups = store.resolve_groups(&user_ids).await?;

            for (((submission, name), email), group) in
                submissions.iter().zip(names).zip(emails).zip(groups)
            {
                debug!(
                    submission_id = %submission.submission_id,
                    user_id = %submission.user_id,
                    "flattening submission"
                );
                for (metric, value) in submission.metrics() {
                    rows.push(ResolvedSubmissionRow {
                        group: group.clone(),
                        user_id: submission.user_id.clone(),
                        name: name.clone(),
                        email: email.clone(),
                        metric: metric.to_string(),
                        course: coursework.coursework_name.clone(),
                        value,
                    });
                }
            }
        }
        debug!(course_id, rows = rows.len(), "retrieved submissions");

        report::pivot(&rows)
    }
}
