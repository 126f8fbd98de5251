use crate::api::{ClassroomApi, SheetsApi, ValueInputMode};
use crate::models::{NameMapping, Student};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Range holding the hand-maintained `formatted_name` → `group` table.
pub const USER_MAPPINGS_RANGE: &str = "user_mappings";
/// Range holding the persisted student cache (sheet-cache strategy).
pub const USER_CACHE_RANGE: &str = "user_ids";
const USER_CACHE_WRITE_RANGE: &str = "user_ids!A1";
const CACHE_COLUMNS: [&str; 5] = ["user_id", "first_name", "last_name", "full_name", "email"];
const CACHE_FORMATTED_NAME: &str = "formatted_name";

/// Group reported for students with no mapping entry.
pub const UNRESOLVED_GROUP: &str = "???";
const UNRESOLVED_SUFFIX: &str = " (???)";
const MATCH_CUTOFF: f32 = 0.6;

/// Where the student cache comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RosterStrategy {
    /// Load the course roster once when the store is built.
    #[default]
    PerCourse,
    /// Load the `user_ids` sheet, look up unknown users one at a time and
    /// persist the cache back to the sheet after each lookup.
    SheetCache,
}

impl FromStr for RosterStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "per-course" => Ok(RosterStrategy::PerCourse),
            "sheet-cache" => Ok(RosterStrategy::SheetCache),
            other => anyhow::bail!(
                "unknown roster strategy {:?}, expected per-course or sheet-cache",
                other
            ),
        }
    }
}

impl fmt::Display for RosterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterStrategy::PerCourse => write!(f, "per-course"),
            RosterStrategy::SheetCache => write!(f, "sheet-cache"),
        }
    }
}

/// Candidate pool used for the fuzzy name match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPool {
    /// Match against the normalized mapping names.
    #[default]
    Mapping,
    /// Match the normalized name against its own characters. Kept because
    /// existing reports were produced this way; it only ever matches names
    /// of one or two characters, so real students fall through to the
    /// unresolved label.
    SelfReferential,
}

impl FromStr for MatchPool {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mapping" => Ok(MatchPool::Mapping),
            "self" => Ok(MatchPool::SelfReferential),
            other => anyhow::bail!("unknown name match pool {:?}, expected mapping or self", other),
        }
    }
}

/// Resolves classroom user ids to mapped names, groups and emails.
pub struct UserStore<'a, C, S> {
    classroom: &'a C,
    sheets: &'a S,
    spreadsheet_id: String,
    strategy: RosterStrategy,
    match_pool: MatchPool,
    mappings: Vec<NameMapping>,
    users: IndexMap<String, Student>,
}

impl<'a, C: ClassroomApi, S: SheetsApi> UserStore<'a, C, S> {
    pub async fn load(
        classroom: &'a C,
        sheets: &'a S,
        spreadsheet_id: &str,
        course_id: &str,
        strategy: RosterStrategy,
        match_pool: MatchPool,
    ) -> Result<Self> {
        let mapping_table = sheets
            .read_table(spreadsheet_id, USER_MAPPINGS_RANGE)
            .await
            .context("Failed to read user mappings")?;
        let mappings = mapping_table
            .select(&["formatted_name", "group"])?
            .into_iter()
            .map(|row| NameMapping {
                formatted_name: row[0].to_string(),
                group: row[1].to_string(),
            })
            .collect::<Vec<_>>();

        let users: IndexMap<String, Student> = match strategy {
            RosterStrategy::PerCourse => classroom
                .list_students(course_id)
                .await
                .with_context(|| format!("Failed to fetch roster for course {}", course_id))?
                .into_iter()
                .map(|s| (s.user_id.clone(), s))
                .collect(),
            RosterStrategy::SheetCache => {
                let cache = sheets
                    .read_table(spreadsheet_id, USER_CACHE_RANGE)
                    .await
                    .context("Failed to read cached users")?;
                if cache.header().is_empty() {
                    debug!(range = USER_CACHE_RANGE, "user cache is empty, starting fresh");
                    IndexMap::new()
                } else {
                    cache
                        .select(&CACHE_COLUMNS)?
                        .into_iter()
                        .map(|row| {
                            let student = Student {
                                user_id: row[0].to_string(),
                                first_name: row[1].to_string(),
                                last_name: row[2].to_string(),
                                full_name: row[3].to_string(),
                                email: row[4].to_string(),
                            };
                            (student.user_id.clone(), student)
                        })
                        .collect()
                }
            }
        };

        info!(
            course_id,
            %strategy,
            mappings = mappings.len(),
            users = users.len(),
            "loaded user store"
        );

        Ok(Self {
            classroom,
            sheets,
            spreadsheet_id: spreadsheet_id.to_string(),
            strategy,
            match_pool,
            mappings,
            users,
        })
    }

    /// Mapped name for each user, or the Classroom name marked as unresolved.
    pub async fn resolve_names(&mut self, user_ids: &[String]) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let formatted = self.user(user_id).await?.formatted_name();
            names.push(self.closest_name(&formatted));
        }
        Ok(names)
    }

    pub async fn resolve_groups(&mut self, user_ids: &[String]) -> Result<Vec<String>> {
        let names = self.resolve_names(user_ids).await?;
        Ok(names
            .iter()
            .map(|name| {
                self.mappings
                    .iter()
                    .find(|m| &m.formatted_name == name)
                    .map(|m| m.group.clone())
                    .unwrap_or_else(|| UNRESOLVED_GROUP.to_string())
            })
            .collect())
    }

    pub async fn resolve_emails(&mut self, user_ids: &[String]) -> Result<Vec<String>> {
        let mut emails = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            emails.push(self.user(user_id).await?.email.clone());
        }
        Ok(emails)
    }

    async fn user(&mut self, user_id: &str) -> Result<&Student> {
        if !self.users.contains_key(user_id) {
            match self.strategy {
                RosterStrategy::PerCourse => {
                    anyhow::bail!("user {} is not on the course roster", user_id)
                }
                RosterStrategy::SheetCache => {
                    debug!(user_id, "user not cached, fetching profile");
                    let student = self
                        .classroom
                        .get_user(user_id)
                        .await
                        .with_context(|| format!("Failed to fetch profile for user {}", user_id))?;
                    self.users.insert(user_id.to_string(), student);
                    self.save().await?;
                }
            }
        }
        Ok(&self.users[user_id])
    }

    fn closest_name(&self, name: &str) -> String {
        let query = normalize(name);
        let pool: Vec<String> = match self.match_pool {
            MatchPool::Mapping => self
                .mappings
                .iter()
                .map(|m| normalize(&m.formatted_name))
                .collect(),
            MatchPool::SelfReferential => query.chars().map(String::from).collect(),
        };
        let candidates: Vec<&str> = pool.iter().map(String::as_str).collect();

        let matched = similar::get_close_matches(query.as_str(), &candidates, 1, MATCH_CUTOFF)
            .first()
            .and_then(|m| {
                self.mappings
                    .iter()
                    .find(|mapping| normalize(&mapping.formatted_name) == *m)
            });

        match matched {
            Some(mapping) => mapping.formatted_name.clone(),
            None => {
                warn!(name, "no name mapping found");
                format!("{}{}", name, UNRESOLVED_SUFFIX)
            }
        }
    }

    /// Persist the whole cache, header included, so an empty `user_ids`
    /// sheet is initialized on the first lookup.
    async fn save(&self) -> Result<()> {
        let header = CACHE_COLUMNS
            .iter()
            .chain(std::iter::once(&CACHE_FORMATTED_NAME))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();
        let rows: Vec<Vec<String>> = std::iter::once(header)
            .chain(self.users.values().map(|s| {
                vec![
                    s.user_id.clone(),
                    s.first_name.clone(),
                    s.last_name.clone(),
                    s.full_name.clone(),
                    s.email.clone(),
                    s.formatted_name(),
                ]
            }))
            .collect();
        self.sheets
            .update_values(
                &self.spreadsheet_id,
                USER_CACHE_WRITE_RANGE,
                &rows,
                ValueInputMode::Literal,
            )
            .await
            .context("Failed to save cached users")?;
        Ok(())
    }
}

/// Lowercase and drop commas so "Doe, Jane" and "doe jane" compare equal.
fn normalize(name: &str) -> String {
    name.to_lowercase().replace(',', "")
}
