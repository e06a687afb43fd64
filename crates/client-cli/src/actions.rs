//! User actions on a ready session. State only changes after the server
//! confirms; a failed action leaves the snapshot as it was.

use crate::api::CourseApi;
use crate::error::{ActionError, ApiError, ValidationError};
use crate::state::{Session, SessionState};
use crate::storage::SessionStore;
use futures::future::join_all;
use shared::{Course, Enrollment, Grade, NewCourse, NewGrade};

/// One row of a grading form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeEntry {
    pub enrollment: u64,
    pub score: String,
    pub comment: String,
}

impl std::str::FromStr for GradeEntry {
    type Err = ValidationError;

    /// `ENROLLMENT=SCORE[:COMMENT]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (enrollment, rest) = s
            .split_once('=')
            .ok_or_else(|| ValidationError::new("grade", format!("expected ENROLLMENT=SCORE, got '{}'", s)))?;
        let enrollment = enrollment
            .trim()
            .parse()
            .map_err(|_| ValidationError::new("enrollment", format!("not an id: '{}'", enrollment)))?;
        let (score, comment) = rest.split_once(':').unwrap_or((rest, ""));

        Ok(Self {
            enrollment,
            score: score.trim().to_string(),
            comment: comment.trim().to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct GradeBatchReport {
    pub created: Vec<Grade>,
    pub failed: Vec<(u64, ApiError)>,
}

impl GradeBatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Action handlers bound to one ready session
pub struct Actions<'a> {
    api: &'a dyn CourseApi,
    store: &'a dyn SessionStore,
}

impl<'a> Actions<'a> {
    pub fn new(api: &'a dyn CourseApi, store: &'a dyn SessionStore) -> Self {
        Self { api, store }
    }

    pub async fn create_course(
        &self,
        state: &mut SessionState,
        name: &str,
        description: &str,
    ) -> Result<Course, ActionError> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", "is required").into());
        }
        if description.is_empty() {
            return Err(ValidationError::new("description", "is required").into());
        }

        let course = self
            .api
            .create_course(&NewCourse {
                name: name.to_string(),
                description: description.to_string(),
            })
            .await?;

        tracing::info!("Created course {} ({})", course.name, course.id);
        state.courses.insert(0, course.clone());
        Ok(course)
    }

    pub async fn enroll(&self, state: &mut SessionState, course_id: u64) -> Result<Enrollment, ActionError> {
        if state.enrolled_course_ids().contains(&course_id) {
            return Err(ValidationError::new("course", format!("already enrolled in course {}", course_id)).into());
        }

        let enrollment = self.api.enroll(course_id).await?;
        tracing::info!("Enrolled {} in course {}", enrollment.user, enrollment.course);
        state.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    /// Post every filled-in entry concurrently. Rows with an empty score are
    /// skipped; at least one must remain.
    pub async fn submit_grades(
        &self,
        state: &mut SessionState,
        entries: Vec<GradeEntry>,
    ) -> Result<GradeBatchReport, ActionError> {
        let to_submit: Vec<NewGrade> = entries
            .into_iter()
            .filter(|entry| !entry.score.trim().is_empty())
            .map(|entry| {
                let score = entry.score.trim().to_string();
                if score.parse::<f64>().is_err() {
                    return Err(ValidationError::new(
                        "score",
                        format!("'{}' is not a number (enrollment {})", score, entry.enrollment),
                    ));
                }
                Ok(NewGrade {
                    enrollment: entry.enrollment,
                    score,
                    comment: Some(entry.comment).filter(|c| !c.is_empty()),
                })
            })
            .collect::<Result<_, _>>()?;

        if to_submit.is_empty() {
            return Err(ValidationError::new("grades", "please enter at least one grade").into());
        }

        let results = join_all(to_submit.iter().map(|grade| self.api.create_grade(grade))).await;

        let mut report = GradeBatchReport::default();
        for (request, result) in to_submit.iter().zip(results) {
            match result {
                Ok(grade) => {
                    match state.enrollment(request.enrollment).map(|e| e.course) {
                        Some(course) => state.grades.entry(course).or_default().insert(0, grade.clone()),
                        None => tracing::warn!(
                            "Grade {} created for unknown enrollment {}",
                            grade.id,
                            request.enrollment
                        ),
                    }
                    report.created.push(grade);
                }
                Err(e) => {
                    tracing::warn!("Failed to create grade for enrollment {}: {}", request.enrollment, e);
                    report.failed.push((request.enrollment, e));
                }
            }
        }

        Ok(report)
    }

    /// Clear the persisted session and drop the snapshot
    pub fn logout(&self, session: &mut Session) -> Result<(), ActionError> {
        self.store.clear()?;
        session.tear_down();
        tracing::info!("Logged out");
        Ok(())
    }
}
