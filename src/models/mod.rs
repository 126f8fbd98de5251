use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Submission state marking a turn-in in the submission history.
pub const TURNED_IN: &str = "TURNED_IN";

/// Metric names produced when a submission is flattened, in output order.
pub const METRIC_TURN_IN_TIME: &str = "turn_in_time";
pub const METRIC_STATE: &str = "state";
pub const METRIC_NUM_ATTACHMENTS: &str = "num_attachments";

// ============================================================================
// Google Classroom API Models
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListResponse {
    #[serde(default)]
    pub courses: Vec<ApiCourse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCourse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWorkListResponse {
    #[serde(default)]
    pub course_work: Vec<ApiCourseWork>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCourseWork {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmissionListResponse {
    #[serde(default)]
    pub student_submissions: Vec<ApiSubmission>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSubmission {
    pub id: String,
    pub user_id: String,
    pub state: String,
    pub assignment_submission: Option<AssignmentSubmission>,
    #[serde(default)]
    pub submission_history: Vec<SubmissionHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentSubmission {
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
}

/// One entry of a submission's history. Grade changes carry a
/// `gradeHistory` instead of a `stateHistory` and are skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionHistory {
    pub state_history: Option<StateHistory>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateHistory {
    pub state: String,
    pub state_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListResponse {
    #[serde(default)]
    pub students: Vec<ApiStudent>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStudent {
    pub user_id: String,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: ProfileName,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub full_name: String,
}

// ============================================================================
// Google Sheets API Models
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRangeBody<'a> {
    pub range: &'a str,
    pub major_dimension: &'static str,
    pub values: &'a [Vec<String>],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_cells: u64,
}

// ============================================================================
// Domain Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
}

impl From<ApiCourse> for Course {
    fn from(course: ApiCourse) -> Self {
        Self {
            course_id: course.id,
            course_name: course.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coursework {
    pub coursework_id: String,
    pub coursework_name: String,
}

impl From<ApiCourseWork> for Coursework {
    fn from(work: ApiCourseWork) -> Self {
        Self {
            coursework_id: work.id,
            coursework_name: work.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub submission_id: String,
    pub user_id: String,
    pub turn_in_time: Option<DateTime<Utc>>,
    pub state: String,
    pub num_attachments: usize,
}

impl Submission {
    /// Flatten into `(metric, value)` pairs. A missing turn-in time is an
    /// empty cell.
    pub fn metrics(&self) -> [(&'static str, String); 3] {
        let turn_in = self
            .turn_in_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        [
            (METRIC_TURN_IN_TIME, turn_in),
            (METRIC_STATE, self.state.clone()),
            (METRIC_NUM_ATTACHMENTS, self.num_attachments.to_string()),
        ]
    }
}

impl From<ApiSubmission> for Submission {
    fn from(sub: ApiSubmission) -> Self {
        let turn_in_time = last_turn_in(&sub.submission_history);
        let num_attachments = sub
            .assignment_submission
            .map(|a| a.attachments.len())
            .unwrap_or(0);
        Self {
            submission_id: sub.id,
            user_id: sub.user_id,
            turn_in_time,
            state: sub.state,
            num_attachments,
        }
    }
}

/// Latest `TURNED_IN` timestamp in a submission history, if any.
pub fn last_turn_in(history: &[SubmissionHistory]) -> Option<DateTime<Utc>> {
    history
        .iter()
        .filter_map(|entry| entry.state_history.as_ref())
        .filter(|state| state.state == TURNED_IN)
        .map(|state| state.state_timestamp)
        .max()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
}

impl Student {
    /// "last, first" rendering used as the join key against the mapping sheet.
    pub fn formatted_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

impl From<UserProfile> for Student {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.id,
            first_name: profile.name.given_name,
            last_name: profile.name.family_name,
            full_name: profile.name.full_name,
            email: profile.email_address.unwrap_or_default(),
        }
    }
}

impl From<ApiStudent> for Student {
    fn from(student: ApiStudent) -> Self {
        let user_id = student.user_id;
        Self {
            user_id,
            ..Student::from(student.profile)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMapping {
    pub formatted_name: String,
    pub group: String,
}

/// One resolved metric value for one student on one coursework item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubmissionRow {
    pub group: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub metric: String,
    pub course: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_submission(json: &str) -> Submission {
        serde_json::from_str::<ApiSubmission>(json).unwrap().into()
    }

    #[test]
    fn turn_in_absent_without_turned_in_history() {
        let sub = parse_submission(
            r#"{
                "id": "s1",
                "userId": "u1",
                "state": "CREATED",
                "assignmentSubmission": {},
                "submissionHistory": [
                    {"stateHistory": {"state": "CREATED", "stateTimestamp": "2024-03-01T09:00:00Z"}},
                    {"gradeHistory": {"pointsEarned": 3}}
                ]
            }"#,
        );
        assert_eq!(sub.turn_in_time, None);
        assert_eq!(sub.num_attachments, 0);
        assert_eq!(sub.metrics()[0], (METRIC_TURN_IN_TIME, String::new()));
    }

    #[test]
    fn turn_in_is_latest_turned_in_entry() {
        let sub = parse_submission(
            r#"{
                "id": "s2",
                "userId": "u1",
                "state": "TURNED_IN",
                "assignmentSubmission": {"attachments": [{"link": {}}, {"driveFile": {}}]},
                "submissionHistory": [
                    {"stateHistory": {"state": "TURNED_IN", "stateTimestamp": "2024-03-01T09:00:00Z"}},
                    {"stateHistory": {"state": "RECLAIMED_BY_STUDENT", "stateTimestamp": "2024-03-03T09:00:00Z"}},
                    {"stateHistory": {"state": "TURNED_IN", "stateTimestamp": "2024-03-02T17:30:00Z"}}
                ]
            }"#,
        );
        let expected: DateTime<Utc> = "2024-03-02T17:30:00Z".parse().unwrap();
        assert_eq!(sub.turn_in_time, Some(expected));
        assert_eq!(sub.num_attachments, 2);

        let metrics = sub.metrics();
        assert_eq!(metrics[0].1, "2024-03-02 17:30:00");
        assert_eq!(metrics[1], (METRIC_STATE, "TURNED_IN".to_string()));
        assert_eq!(metrics[2], (METRIC_NUM_ATTACHMENTS, "2".to_string()));
    }

    #[test]
    fn submission_without_assignment_payload_has_no_attachments() {
        let sub = parse_submission(r#"{"id": "s3", "userId": "u2", "state": "NEW"}"#);
        assert_eq!(sub.num_attachments, 0);
        assert_eq!(sub.turn_in_time, None);
    }

    #[test]
    fn roster_entry_uses_user_id_and_profile_name() {
        let student: Student = serde_json::from_str::<ApiStudent>(
            r#"{
                "courseId": "c1",
                "userId": "111",
                "profile": {
                    "id": "111",
                    "name": {"givenName": "Jane", "familyName": "Doe", "fullName": "Jane Doe"},
                    "emailAddress": "jane@example.org"
                }
            }"#,
        )
        .unwrap()
        .into();
        assert_eq!(student.user_id, "111");
        assert_eq!(student.full_name, "Jane Doe");
        assert_eq!(student.email, "jane@example.org");
        assert_eq!(student.formatted_name(), "Doe, Jane");
    }
}
