use crate::models::ResolvedSubmissionRow;
use crate::table::Table;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

/// Leading report columns; one column per coursework name follows.
pub const INDEX_COLUMNS: [&str; 4] = ["group", "name", "email", "metric"];

type RowKey = (String, String, String, String, String);

/// Pivot long rows into one row per (group, user, name, email, metric) and
/// one column per coursework name.
///
/// Rows and columns are sorted ascending. The user id orders rows but is not
/// emitted. Cells with no value are left empty.
pub fn pivot(rows: &[ResolvedSubmissionRow]) -> Result<Table> {
    let mut courses = BTreeSet::new();
    let mut cells: BTreeMap<RowKey, BTreeMap<&str, &str>> = BTreeMap::new();

    for row in rows {
        courses.insert(row.course.as_str());
        let key = (
            row.group.clone(),
            row.user_id.clone(),
            row.name.clone(),
            row.email.clone(),
            row.metric.clone(),
        );
        let previous = cells
            .entry(key)
            .or_default()
            .insert(row.course.as_str(), row.value.as_str());
        if previous.is_some() {
            anyhow::bail!(
                "duplicate {} value for user {} in {:?}",
                row.metric,
                row.user_id,
                row.course
            );
        }
    }

    let header = INDEX_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(courses.iter().map(|c| c.to_string()))
        .collect();

    let body = cells
        .into_iter()
        .map(|((group, _user_id, name, email, metric), values)| {
            let mut line = vec![group, name, email, metric];
            line.extend(
                courses
                    .iter()
                    .map(|course| values.get(course).copied().unwrap_or_default().to_string()),
            );
            line
        })
        .collect();

    Ok(Table::new(header, body))
}
