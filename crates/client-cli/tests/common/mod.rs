#![allow(dead_code)]

use async_trait::async_trait;
use coursedesk::error::ApiError;
use coursedesk::CourseApi;
use shared::{
    Course, Credentials, Enrollment, Grade, GradesByCourse, NewCourse, NewGrade, Owner, Paginated,
    Registration, Role, Score, TokenPair, User,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Scripted stand-in for the course API that records every call
#[derive(Default)]
pub struct FakeApi {
    pub me: Option<User>,
    pub courses: Vec<Course>,
    pub enrollments: Vec<Enrollment>,
    pub course_grades: GradesByCourse,
    pub my_grades: Vec<Grade>,
    pub users: Vec<User>,
    /// Endpoints answering 500
    pub failing: HashSet<&'static str>,
    /// Enrollments whose grade submission is rejected
    pub rejected_enrollments: HashSet<u64>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            ..Default::default()
        }
    }

    pub fn failing(mut self, endpoint: &'static str) -> Self {
        self.failing.insert(endpoint);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call(&self, name: &'static str, detail: Option<String>) -> Result<(), ApiError> {
        let entry = match detail {
            Some(detail) => format!("{}:{}", name, detail),
            None => name.to_string(),
        };
        self.calls.lock().unwrap().push(entry);
        if self.failing.contains(name) {
            return Err(ApiError::Status {
                endpoint: name.to_string(),
                status: 500,
                detail: None,
            });
        }
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

fn page<T: Clone>(items: &[T]) -> Paginated<T> {
    Paginated {
        count: items.len() as u64,
        next: None,
        previous: None,
        results: items.to_vec(),
    }
}

#[async_trait]
impl CourseApi for FakeApi {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        self.call("login", Some(credentials.username.clone()))?;
        Ok(TokenPair {
            access: format!("access-{}", credentials.username),
            refresh: format!("refresh-{}", credentials.username),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        self.call("register", Some(registration.username.clone()))
    }

    async fn my_user(&self) -> Result<User, ApiError> {
        self.call("my_user", None)?;
        self.me.clone().ok_or_else(|| ApiError::Status {
            endpoint: "my_user".to_string(),
            status: 401,
            detail: Some("Authentication credentials were not provided.".to_string()),
        })
    }

    async fn courses(&self, _page: Option<u32>) -> Result<Paginated<Course>, ApiError> {
        self.call("courses", None)?;
        Ok(page(&self.courses))
    }

    async fn create_course(&self, course: &NewCourse) -> Result<Course, ApiError> {
        self.call("create_course", Some(course.name.clone()))?;
        Ok(Course {
            id: self.next_id(),
            name: course.name.clone(),
            description: course.description.clone(),
            created_by: Owner::Name(self.me.as_ref().map(|u| u.username.clone()).unwrap_or_default()),
        })
    }

    async fn enroll(&self, course_id: u64) -> Result<Enrollment, ApiError> {
        self.call("enroll", Some(course_id.to_string()))?;
        Ok(Enrollment {
            id: self.next_id(),
            user: self.me.as_ref().map(|u| u.username.clone()).unwrap_or_default(),
            course: course_id,
            created_at: "2024-06-01T12:00:00Z".to_string(),
        })
    }

    async fn my_enrollments(&self, _page: Option<u32>) -> Result<Paginated<Enrollment>, ApiError> {
        self.call("my_enrollments", None)?;
        Ok(page(&self.enrollments))
    }

    async fn instructor_enrollments(&self, _page: Option<u32>) -> Result<Paginated<Enrollment>, ApiError> {
        self.call("instructor_enrollments", None)?;
        Ok(page(&self.enrollments))
    }

    async fn create_grade(&self, grade: &NewGrade) -> Result<Grade, ApiError> {
        self.call("create_grade", Some(grade.enrollment.to_string()))?;
        if self.rejected_enrollments.contains(&grade.enrollment) {
            return Err(ApiError::Status {
                endpoint: "create_grade".to_string(),
                status: 400,
                detail: Some("Grade already exists".to_string()),
            });
        }
        Ok(Grade {
            id: self.next_id(),
            enrollment: grade.enrollment,
            score: Score::Text(grade.score.clone()),
            comment: grade.comment.clone().unwrap_or_default(),
            created_at: "2024-06-02T08:00:00Z".to_string(),
        })
    }

    async fn course_grades(&self, course_id: u64, _page: Option<u32>) -> Result<Vec<Grade>, ApiError> {
        self.call("course_grades", Some(course_id.to_string()))?;
        Ok(self.course_grades.get(&course_id).cloned().unwrap_or_default())
    }

    async fn my_grades(&self, _page: Option<u32>) -> Result<Vec<Grade>, ApiError> {
        self.call("my_grades", None)?;
        Ok(self.my_grades.clone())
    }

    async fn users(&self, _page: Option<u32>) -> Result<Paginated<User>, ApiError> {
        self.call("users", None)?;
        Ok(page(&self.users))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn user(id: u64, username: &str, role: Role) -> User {
    User {
        id,
        username: username.to_string(),
        role,
    }
}

pub fn course(id: u64, name: &str, owner: &str) -> Course {
    Course {
        id,
        name: name.to_string(),
        description: format!("About {}", name),
        created_by: Owner::Name(owner.to_string()),
    }
}

pub fn enrollment(id: u64, user: &str, course: u64) -> Enrollment {
    Enrollment {
        id,
        user: user.to_string(),
        course,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn grade(id: u64, enrollment: u64, score: f64, created_at: &str) -> Grade {
    Grade {
        id,
        enrollment,
        score: Score::Number(score),
        comment: String::new(),
        created_at: created_at.to_string(),
    }
}
