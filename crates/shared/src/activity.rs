//! Recent-activity feed shown on dashboards.
//!
//! Courses carry no creation time, so a course's id stands in for its
//! recency. When courses and grades are mixed the id is compared against
//! the grade's epoch milliseconds as if both were timestamps.

use crate::models::{parse_timestamp_millis, Course, Enrollment, Grade, GradesByCourse, Score};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Number of courses considered for the feed
pub const RECENT_COURSES: usize = 3;
/// Number of grades considered for the feed, and the feed length
pub const RECENT_GRADES: usize = 5;
pub const FEED_LEN: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Activity {
    /// A course was created
    Course { id: u64, name: String },
    /// A grade was given in a course
    Grade {
        id: u64,
        created_at: String,
        score: Score,
        comment: String,
        course_id: u64,
        course_name: String,
        enrollment: u64,
    },
}

impl Activity {
    /// Display-ordering key; larger sorts first.
    ///
    /// Unparsable grade timestamps sort last.
    pub fn ordering_key(&self) -> i64 {
        match self {
            Activity::Course { id, .. } => i64::try_from(*id).unwrap_or(i64::MAX),
            Activity::Grade { created_at, .. } => {
                parse_timestamp_millis(created_at).unwrap_or(i64::MIN)
            }
        }
    }
}

/// Merge the newest courses and grades into one feed of at most
/// [`FEED_LEN`] entries, newest first.
///
/// Grades filed under a course id that is not in `courses` are ignored.
pub fn merge_activities(courses: &[Course], grades_by_course: &GradesByCourse) -> Vec<Activity> {
    let mut recent_courses: Vec<&Course> = courses.iter().collect();
    recent_courses.sort_by_key(|course| Reverse(course.id));
    recent_courses.truncate(RECENT_COURSES);

    let mut all_grades: Vec<(&Grade, &Course)> = courses
        .iter()
        .flat_map(|course| {
            grades_by_course
                .get(&course.id)
                .into_iter()
                .flatten()
                .map(move |grade| (grade, course))
        })
        .collect();
    all_grades.sort_by_key(|(grade, _)| Reverse(grade.timestamp_millis().unwrap_or(i64::MIN)));
    all_grades.truncate(RECENT_GRADES);

    let mut activities: Vec<Activity> = recent_courses
        .into_iter()
        .map(|course| Activity::Course {
            id: course.id,
            name: course.name.clone(),
        })
        .chain(all_grades.into_iter().map(|(grade, course)| Activity::Grade {
            id: grade.id,
            created_at: grade.created_at.clone(),
            score: grade.score.clone(),
            comment: grade.comment.clone(),
            course_id: course.id,
            course_name: course.name.clone(),
            enrollment: grade.enrollment,
        }))
        .collect();

    // stable: equal keys keep courses ahead of grades
    activities.sort_by_key(|activity| Reverse(activity.ordering_key()));
    activities.truncate(FEED_LEN);
    activities
}

/// Map enrollment id to the enrolled username
pub fn enrollment_usernames(enrollments: &[Enrollment]) -> HashMap<u64, String> {
    enrollments
        .iter()
        .map(|enrollment| (enrollment.id, enrollment.user.clone()))
        .collect()
}

/// Student shown for a grade; empty when the enrollment is unknown
pub fn student_name(names: &HashMap<u64, String>, enrollment: u64) -> &str {
    names.get(&enrollment).map(String::as_str).unwrap_or("")
}

/// Group grades under the course of their enrollment. Grades whose
/// enrollment is unknown are dropped.
pub fn group_grades_by_course(grades: Vec<Grade>, enrollments: &[Enrollment]) -> GradesByCourse {
    let course_of: HashMap<u64, u64> = enrollments.iter().map(|e| (e.id, e.course)).collect();
    let mut grouped = GradesByCourse::new();
    for grade in grades {
        if let Some(course) = course_of.get(&grade.enrollment) {
            grouped.entry(*course).or_default().push(grade);
        }
    }
    grouped
}
