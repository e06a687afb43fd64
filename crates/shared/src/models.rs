use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Identity
// ============================================================================

/// Role attached to every account; decides which dashboard a user may open
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Current user as returned by `GET /api/my-user/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub role: Role,
}

// ============================================================================
// Courses, enrollments, grades
// ============================================================================

/// Owner of a course. The API reports either the owner's id or username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Owner {
    Id(u64),
    Name(String),
}

impl Owner {
    /// Only a username owner can match; an id never equals a username
    pub fn matches_username(&self, username: &str) -> bool {
        match self {
            Owner::Name(name) => name == username,
            Owner::Id(_) => false,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Id(id) => write!(f, "{}", id),
            Owner::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_by: Owner,
}

/// Links a user (by username) to a course
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enrollment {
    pub id: u64,
    pub user: String,
    pub course: u64,
    pub created_at: String,
}

/// Score as the API sends it: a JSON number or a numeric string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Score {
    Number(f64),
    Text(String),
}

impl Score {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Score::Number(n) => Some(*n),
            Score::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Number(n) => write!(f, "{}", n),
            Score::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Grade {
    pub id: u64,
    pub enrollment: u64,
    pub score: Score,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comment: String,
    pub created_at: String,
}

impl Grade {
    /// `created_at` in epoch milliseconds, if it parses
    pub fn timestamp_millis(&self) -> Option<i64> {
        parse_timestamp_millis(&self.created_at)
    }
}

/// Grades keyed by the id of the course their enrollment belongs to
pub type GradesByCourse = BTreeMap<u64, Vec<Grade>>;

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a server timestamp into epoch milliseconds.
///
/// Accepts RFC 3339 and, failing that, a zone-less `YYYY-MM-DDTHH:MM:SS[.f]`
/// read as UTC.
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

// ============================================================================
// Listings
// ============================================================================

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Some list endpoints answer with a bare array instead of a page
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Listing<T> {
    Page(Paginated<T>),
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_results(self) -> Vec<T> {
        match self {
            Listing::Page(page) => page.results,
            Listing::Plain(items) => items,
        }
    }
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Answer of `POST /api/token/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub course: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGrade {
    pub enrollment: u64,
    pub score: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Instructor).unwrap(), "\"instructor\"");
        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Student);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("teacher".parse::<Role>().is_err());
    }

    #[test]
    fn test_course_owner_forms() {
        let json = r#"{"id":3,"name":"Rust","description":"d","created_by":"alice"}"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert!(course.created_by.matches_username("alice"));
        assert!(!course.created_by.matches_username("bob"));

        let json = r#"{"id":4,"name":"Go","description":"d","created_by":17}"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(course.created_by, Owner::Id(17));
        assert!(!course.created_by.matches_username("alice"));
        assert!(!course.created_by.matches_username("17"));
    }

    #[test]
    fn test_grade_score_forms() {
        let json = r#"{"id":1,"enrollment":2,"score":"87.5","comment":null,"created_at":"2024-05-01T10:00:00Z"}"#;
        let grade: Grade = serde_json::from_str(json).unwrap();
        assert_eq!(grade.score, Score::Text("87.5".to_string()));
        assert_eq!(grade.score.as_f64(), Some(87.5));
        assert_eq!(grade.comment, "");

        let json = r#"{"id":1,"enrollment":2,"score":90,"created_at":"2024-05-01T10:00:00Z"}"#;
        let grade: Grade = serde_json::from_str(json).unwrap();
        assert_eq!(grade.score.as_f64(), Some(90.0));
        assert_eq!(grade.score.to_string(), "90");
    }

    #[test]
    fn test_timestamp_parsing() {
        assert_eq!(parse_timestamp_millis("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(parse_timestamp_millis("1970-01-01T01:00:01+01:00"), Some(1000));
        assert_eq!(parse_timestamp_millis("1970-01-01T00:00:01.250"), Some(1250));
        assert_eq!(parse_timestamp_millis("yesterday"), None);
    }

    #[test]
    fn test_listing_accepts_page_and_array() {
        let page: Listing<u64> =
            serde_json::from_str(r#"{"count":2,"next":null,"previous":null,"results":[1,2]}"#).unwrap();
        assert_eq!(page.into_results(), vec![1, 2]);

        let plain: Listing<u64> = serde_json::from_str("[3]").unwrap();
        assert_eq!(plain.into_results(), vec![3]);
    }

    #[test]
    fn test_new_grade_omits_missing_comment() {
        let body = NewGrade {
            enrollment: 5,
            score: "70".to_string(),
            comment: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"enrollment":5,"score":"70"}"#);
    }
}
