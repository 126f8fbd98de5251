use super::http::GoogleHttp;
use crate::error::ApiError;
use crate::models::{
    ApiCourse, Course, CourseListResponse, CourseWorkListResponse, Coursework, Student,
    StudentListResponse, StudentSubmissionListResponse, Submission, UserProfile,
};
use indexmap::IndexMap;
use tracing::debug;

const API_BASE: &str = "https://classroom.googleapis.com/v1";

/// One page of a course roster.
#[derive(Debug, Clone, Default)]
pub struct StudentPage {
    pub students: Vec<Student>,
    pub next_page_token: Option<String>,
}

/// Read access to Google Classroom.
pub trait ClassroomApi {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError>;

    async fn list_courseworks(&self, course_id: &str) -> Result<Vec<Coursework>, ApiError>;

    async fn list_submissions(
        &self,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<Vec<Submission>, ApiError>;

    async fn student_page(
        &self,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<StudentPage, ApiError>;

    async fn get_user(&self, user_id: &str) -> Result<Student, ApiError>;

    /// Full roster for a course, following page tokens until exhausted.
    async fn list_students(&self, course_id: &str) -> Result<Vec<Student>, ApiError> {
        let mut students = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.student_page(course_id, page_token.as_deref()).await?;
            students.extend(page.students);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(course_id, count = students.len(), "fetched roster");
        Ok(students)
    }
}

#[derive(Clone)]
pub struct ClassroomClient {
    http: GoogleHttp,
}

impl ClassroomClient {
    pub fn new(token: String) -> Self {
        Self {
            http: GoogleHttp::new(API_BASE, token),
        }
    }
}

impl ClassroomApi for ClassroomClient {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        let response: CourseListResponse = self.http.get("/courses", &[]).await?;
        Ok(unique_courses(response.courses))
    }

    async fn list_courseworks(&self, course_id: &str) -> Result<Vec<Coursework>, ApiError> {
        let path = format!("/courses/{}/courseWork", course_id);
        let response: CourseWorkListResponse = self.http.get(&path, &[]).await?;
        Ok(response.course_work.into_iter().map(Into::into).collect())
    }

    async fn list_submissions(
        &self,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<Vec<Submission>, ApiError> {
        let path = format!(
            "/courses/{}/courseWork/{}/studentSubmissions",
            course_id, coursework_id
        );
        let response: StudentSubmissionListResponse = self.http.get(&path, &[]).await?;
        Ok(response
            .student_submissions
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn student_page(
        &self,
        course_id: &str,
        page_token: Option<&str>,
    ) -> Result<StudentPage, ApiError> {
        let path = format!("/courses/{}/students", course_id);
        let mut query = vec![("pageSize", "0")];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response: StudentListResponse = self.http.get(&path, &query).await?;
        Ok(StudentPage {
            students: response.students.into_iter().map(Into::into).collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn get_user(&self, user_id: &str) -> Result<Student, ApiError> {
        let path = format!("/userProfiles/{}", user_id);
        let profile: UserProfile = self.http.get(&path, &[]).await?;
        Ok(profile.into())
    }
}

/// Keep the first course seen for each id, in listing order.
fn unique_courses(courses: Vec<ApiCourse>) -> Vec<Course> {
    let mut unique: IndexMap<String, Course> = IndexMap::new();
    for course in courses {
        unique
            .entry(course.id.clone())
            .or_insert_with(|| course.into());
    }
    unique.into_values().collect()
}
