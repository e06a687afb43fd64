use shared::{
    enrollment_usernames, merge_activities, Activity, Course, Enrollment, Grade, GradesByCourse,
    User,
};
use std::collections::{HashMap, HashSet};

/// Snapshot shared by every view of one authenticated visit
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: User,
    pub courses: Vec<Course>,
    pub enrollments: Vec<Enrollment>,
    pub grades: GradesByCourse,
    /// Only filled for admins
    pub users: Vec<User>,
}

impl SessionState {
    pub fn new(user: User) -> Self {
        Self {
            user,
            courses: Vec::new(),
            enrollments: Vec::new(),
            grades: GradesByCourse::new(),
            users: Vec::new(),
        }
    }

    pub fn recent_activity(&self) -> Vec<Activity> {
        merge_activities(&self.courses, &self.grades)
    }

    pub fn student_names(&self) -> HashMap<u64, String> {
        enrollment_usernames(&self.enrollments)
    }

    pub fn course(&self, id: u64) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn enrollment(&self, id: u64) -> Option<&Enrollment> {
        self.enrollments.iter().find(|e| e.id == id)
    }

    /// Distinct students across all enrollments
    pub fn student_count(&self) -> usize {
        self.enrollments
            .iter()
            .map(|e| e.user.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn enrolled_course_ids(&self) -> HashSet<u64> {
        self.enrollments.iter().map(|e| e.course).collect()
    }

    /// Enrollments of a course that have no grade yet
    pub fn ungraded_enrollments(&self, course_id: u64) -> Vec<&Enrollment> {
        let graded: HashSet<u64> = self
            .grades
            .get(&course_id)
            .map(|list| list.iter().map(|g| g.enrollment).collect())
            .unwrap_or_default();

        self.enrollments
            .iter()
            .filter(|e| e.course == course_id && !graded.contains(&e.id))
            .collect()
    }

    pub fn all_grades(&self) -> impl Iterator<Item = (u64, &Grade)> {
        self.grades
            .iter()
            .flat_map(|(course, list)| list.iter().map(move |g| (*course, g)))
    }

    pub fn total_grades(&self) -> usize {
        self.grades.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    Ready(SessionState),
}

/// Lifecycle owner of the session snapshot. Views only see data once the
/// session is ready.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    phase: Phase,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
        }
    }

    pub fn ready(state: SessionState) -> Self {
        Self {
            phase: Phase::Ready(state),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    pub fn state(&self) -> Option<&SessionState> {
        match &self.phase {
            Phase::Ready(state) => Some(state),
            Phase::Loading => None,
        }
    }

    pub fn state_mut(&mut self) -> Option<&mut SessionState> {
        match &mut self.phase {
            Phase::Ready(state) => Some(state),
            Phase::Loading => None,
        }
    }

    /// Drop the snapshot; the next visit bootstraps again
    pub fn tear_down(&mut self) {
        self.phase = Phase::Loading;
    }
}
