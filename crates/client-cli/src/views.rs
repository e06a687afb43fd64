//! Plain-text rendering of session data

use crate::state::{Session, SessionState};
use chrono::{Local, TimeZone};
use shared::{parse_timestamp_millis, student_name, Activity, Role};
use std::collections::HashMap;
use std::fmt::Write;

pub const LOADING: &str = "Loading...";

/// Render `view` once the session is ready, the loading line before that
pub fn when_ready(session: &Session, view: impl FnOnce(&SessionState) -> String) -> String {
    match session.state() {
        Some(state) => view(state),
        None => LOADING.to_string(),
    }
}

fn local_time(raw: &str) -> String {
    parse_timestamp_millis(raw)
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| raw.to_string())
}

pub fn activity_feed(activities: &[Activity], names: &HashMap<u64, String>) -> String {
    let mut out = String::from("Recent Activity\n");
    if activities.is_empty() {
        out.push_str("  No recent activity.\n");
        return out;
    }

    for activity in activities {
        match activity {
            Activity::Course { name, .. } => {
                let _ = writeln!(out, "  * New course created: {}", name);
            }
            Activity::Grade {
                created_at,
                score,
                comment,
                course_name,
                enrollment,
                ..
            } => {
                let _ = writeln!(out, "  * Grade given: {} in {}", score, course_name);
                let student = student_name(names, *enrollment);
                if !student.is_empty() {
                    let _ = writeln!(out, "      Student: {}", student);
                }
                if !comment.is_empty() {
                    let _ = writeln!(out, "      \"{}\"", comment);
                }
                let _ = writeln!(out, "      {}", local_time(created_at));
            }
        }
    }
    out
}

pub fn dashboard(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Course Manager - {} ({})", state.user.username, state.user.role);
    let _ = writeln!(out);

    match state.user.role {
        Role::Instructor => {
            let _ = writeln!(out, "Courses:     {}", state.courses.len());
            let _ = writeln!(out, "Students:    {}", state.student_count());
            let _ = writeln!(out, "Grades given: {}", state.total_grades());
            let _ = writeln!(out);
            out.push_str(&activity_feed(&state.recent_activity(), &state.student_names()));
        }
        Role::Student => {
            let _ = writeln!(out, "Enrolled courses: {}", state.enrollments.len());
            let _ = writeln!(out, "Grades received:  {}", state.total_grades());
        }
        Role::Admin => {
            let _ = writeln!(out, "Courses: {}", state.courses.len());
            let _ = writeln!(out, "Users:   {}", state.users.len());
            for user in &state.users {
                let _ = writeln!(out, "  {:>5}  {:<20} {}", user.id, user.username, user.role);
            }
        }
    }
    out
}

pub fn course_list(state: &SessionState) -> String {
    if state.courses.is_empty() {
        return "No courses yet.\n".to_string();
    }

    let enrolled = state.enrolled_course_ids();
    let mut out = String::new();
    for course in &state.courses {
        let marker = if state.user.role == Role::Student && enrolled.contains(&course.id) {
            " [enrolled]"
        } else {
            ""
        };
        let _ = writeln!(out, "{:>5}  {}{}", course.id, course.name, marker);
        if !course.description.is_empty() {
            let _ = writeln!(out, "       {}", course.description);
        }
    }
    out
}

/// One row per grade; unknown students show as "-"
pub fn grade_table(state: &SessionState) -> String {
    let names = state.student_names();
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:<16} {:>7}  {}", "Course", "Student", "Score", "Comment");

    let mut rows = 0;
    for (course_id, grade) in state.all_grades() {
        let course = state
            .course(course_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", course_id));
        let student = match student_name(&names, grade.enrollment) {
            "" => "-",
            name => name,
        };
        let _ = writeln!(
            out,
            "{:<24} {:<16} {:>7}  {}",
            course,
            student,
            grade.score.to_string(),
            grade.comment
        );
        rows += 1;
    }
    if rows == 0 {
        out.push_str("No grades yet.\n");
    }
    out
}

/// Per course, the enrollments still waiting for a grade
pub fn pending_grades(state: &SessionState) -> String {
    let mut out = String::new();
    let mut pending = 0;
    for course in &state.courses {
        let ungraded = state.ungraded_enrollments(course.id);
        if ungraded.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{} (#{})", course.name, course.id);
        for enrollment in ungraded {
            let _ = writeln!(out, "  {:>5}  {}", enrollment.id, enrollment.user);
            pending += 1;
        }
    }
    if pending == 0 {
        out.push_str("Every enrolled student has a grade.\n");
    } else {
        let _ = writeln!(out, "\nGrade with: coursedesk grade ENROLLMENT=SCORE[:COMMENT]");
    }
    out
}
