//! Wire types of the course API and the dashboard activity feed

pub mod activity;
pub mod models;

pub use activity::{
    enrollment_usernames, group_grades_by_course, merge_activities, student_name, Activity,
};
pub use models::*;
