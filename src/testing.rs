//! In-memory Classroom and Sheets backends for unit tests.

use crate::api::{ClassroomApi, SheetsApi, StudentPage, ValueInputMode};
use crate::error::ApiError;
use crate::models::{Course, Coursework, Student, Submission};
use reqwest::StatusCode;
use std::cell::RefCell;
use std::collections::HashMap;

pub fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

pub fn student(user_id: &str, first: &str, last: &str) -> Student {
    Student {
        user_id: user_id.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        full_name: format!("{} {}", first, last),
        email: format!("{}.{}@example.org", first.to_lowercase(), last.to_lowercase()),
    }
}

#[derive(Default)]
pub struct FakeClassroom {
    pub courses: Vec<Course>,
    pub courseworks: HashMap<String, Vec<Coursework>>,
    pub submissions: HashMap<(String, String), Vec<Submission>>,
    pub rosters: HashMap<String, Vec<Student>>,
    pub profiles: HashMap<String, Student>,
    pub profile_lookups: RefCell<Vec<String>>,
}

impl ClassroomApi for FakeClassroom {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        Ok(self.courses.clone())
    }

    async fn list_courseworks(&self, course_id: &str) -> Result<Vec<Coursework>, ApiError> {
        Ok(self.courseworks.get(course_id).cloned().unwrap_or_default())
    }

    async fn list_submissions(
        &self,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<Vec<Submission>, ApiError> {
        Ok(self
            .submissions
            .get(&(course_id.to_string(), coursework_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn student_page(
        &self,
        course_id: &str,
        _page_token: Option<&str>,
    ) -> Result<StudentPage, ApiError> {
        Ok(StudentPage {
            students: self.rosters.get(course_id).cloned().unwrap_or_default(),
            next_page_token: None,
        })
    }

    async fn get_user(&self, user_id: &str) -> Result<Student, ApiError> {
        self.profile_lookups.borrow_mut().push(user_id.to_string());
        self.profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: StatusCode::NOT_FOUND,
                url: format!("/userProfiles/{}", user_id),
                body: String::new(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub range: String,
    pub values: Vec<Vec<String>>,
    pub mode: ValueInputMode,
}

/// Sheets keyed by range name. Reading an unknown range fails the way the
/// real API does for a missing tab.
#[derive(Default)]
pub struct FakeSheets {
    pub ranges: RefCell<HashMap<String, Vec<Vec<String>>>>,
    pub writes: RefCell<Vec<RecordedWrite>>,
    pub added: RefCell<Vec<String>>,
}

impl FakeSheets {
    pub fn with_range(self, range: &str, values: Vec<Vec<String>>) -> Self {
        self.ranges.borrow_mut().insert(range.to_string(), values);
        self
    }
}

impl SheetsApi for FakeSheets {
    async fn get_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        self.ranges
            .borrow()
            .get(range)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: StatusCode::BAD_REQUEST,
                url: format!("/values/{}", range),
                body: format!("Unable to parse range: {}", range),
            })
    }

    async fn update_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        mode: ValueInputMode,
    ) -> Result<u64, ApiError> {
        self.writes.borrow_mut().push(RecordedWrite {
            range: range.to_string(),
            values: values.to_vec(),
            mode,
        });
        Ok(values.iter().map(|row| row.len() as u64).sum())
    }

    async fn add_sheet(&self, _spreadsheet_id: &str, title: &str) -> Result<(), ApiError> {
        self.added.borrow_mut().push(title.to_string());
        self.ranges.borrow_mut().insert(title.to_string(), Vec::new());
        Ok(())
    }
}
