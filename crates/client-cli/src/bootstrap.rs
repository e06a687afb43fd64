//! Session bootstrap: resolve who is signed in, check the role required by
//! the protected area, then load the data its views read.
//!
//! Every failure is terminal. The persisted session is cleared and the
//! caller is told to send the user back to login; nothing fetched before
//! the failure is kept.

use crate::api::CourseApi;
use crate::error::BootstrapError;
use crate::state::SessionState;
use crate::storage::SessionStore;
use shared::{group_grades_by_course, GradesByCourse, Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    Start,
    FetchingIdentity,
    Authorized,
    FetchingDependents,
    Ready,
    Unauthorized,
}

#[derive(Debug)]
pub enum BootstrapOutcome {
    Ready(SessionState),
    /// Session was cleared; the user has to log in again
    Redirect(BootstrapError),
}

impl BootstrapOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapOutcome::Ready(_))
    }
}

pub struct Bootstrapper<'a> {
    api: &'a dyn CourseApi,
    store: &'a dyn SessionStore,
    /// `None` accepts whatever role the signed-in user has
    required: Option<Role>,
    phases: Vec<BootstrapPhase>,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(api: &'a dyn CourseApi, store: &'a dyn SessionStore, required: Role) -> Self {
        Self {
            api,
            store,
            required: Some(required),
            phases: vec![BootstrapPhase::Start],
        }
    }

    /// Bootstrap the area of the signed-in user's own role
    pub fn for_own_role(api: &'a dyn CourseApi, store: &'a dyn SessionStore) -> Self {
        Self {
            api,
            store,
            required: None,
            phases: vec![BootstrapPhase::Start],
        }
    }

    /// Phases visited so far, in order
    pub fn phases(&self) -> &[BootstrapPhase] {
        &self.phases
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phases.last().copied().unwrap_or(BootstrapPhase::Start)
    }

    fn enter(&mut self, phase: BootstrapPhase) {
        tracing::debug!("bootstrap ({:?}): {:?} -> {:?}", self.required, self.phase(), phase);
        self.phases.push(phase);
    }

    pub async fn run(&mut self) -> BootstrapOutcome {
        let result = match self.resolve_identity().await {
            Ok(user) => self.fetch_dependents(user).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(state) => {
                self.enter(BootstrapPhase::Ready);
                tracing::info!(
                    "Session ready for {} ({} courses, {} enrollments)",
                    state.user.username,
                    state.courses.len(),
                    state.enrollments.len()
                );
                BootstrapOutcome::Ready(state)
            }
            Err(reason) => {
                self.enter(BootstrapPhase::Unauthorized);
                tracing::warn!("Bootstrap failed, clearing session: {}", reason);
                if let Err(e) = self.store.clear() {
                    tracing::error!("Failed to clear session: {}", e);
                }
                BootstrapOutcome::Redirect(reason)
            }
        }
    }

    async fn resolve_identity(&mut self) -> Result<User, BootstrapError> {
        let user = match self.store.cached_user()? {
            Some(user) => user,
            None => {
                self.enter(BootstrapPhase::FetchingIdentity);
                let user = self.api.my_user().await.map_err(BootstrapError::Identity)?;
                self.store.update(&mut |session| session.user = Some(user.clone()))?;
                user
            }
        };

        if let Some(required) = self.required {
            if user.role != required {
                return Err(BootstrapError::RoleMismatch {
                    required,
                    actual: user.role,
                });
            }
        }

        self.enter(BootstrapPhase::Authorized);
        Ok(user)
    }

    async fn fetch_dependents(&mut self, user: User) -> Result<SessionState, BootstrapError> {
        self.enter(BootstrapPhase::FetchingDependents);
        let mut state = SessionState::new(user);

        let courses = self
            .api
            .courses(None)
            .await
            .map_err(|source| BootstrapError::Dependent { what: "courses", source })?
            .results;

        match state.user.role {
            Role::Instructor => {
                state.courses = courses
                    .into_iter()
                    .filter(|course| course.created_by.matches_username(&state.user.username))
                    .collect();

                state.enrollments = self
                    .api
                    .instructor_enrollments(None)
                    .await
                    .map_err(|source| BootstrapError::Dependent { what: "enrollments", source })?
                    .results;

                let mut grades = GradesByCourse::new();
                for course in &state.courses {
                    let list = self
                        .api
                        .course_grades(course.id, None)
                        .await
                        .map_err(|source| BootstrapError::Dependent { what: "grades", source })?;
                    grades.insert(course.id, list);
                }
                state.grades = grades;
            }
            Role::Student => {
                state.courses = courses;

                state.enrollments = self
                    .api
                    .my_enrollments(None)
                    .await
                    .map_err(|source| BootstrapError::Dependent { what: "enrollments", source })?
                    .results;

                let grades = self
                    .api
                    .my_grades(None)
                    .await
                    .map_err(|source| BootstrapError::Dependent { what: "grades", source })?;
                state.grades = group_grades_by_course(grades, &state.enrollments);
            }
            Role::Admin => {
                state.courses = courses;

                state.users = self
                    .api
                    .users(None)
                    .await
                    .map_err(|source| BootstrapError::Dependent { what: "users", source })?
                    .results;
            }
        }

        Ok(state)
    }
}

/// Run a bootstrap for `required` and return its outcome
pub async fn bootstrap(api: &dyn CourseApi, store: &dyn SessionStore, required: Role) -> BootstrapOutcome {
    Bootstrapper::new(api, store, required).run().await
}
