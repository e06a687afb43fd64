//! Client for the remote course API

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::storage::SessionStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{
    Course, Credentials, EnrollRequest, Enrollment, Grade, Listing, NewCourse, NewGrade,
    Paginated, Registration, TokenPair, User,
};
use std::sync::Arc;

/// Every endpoint the client consumes. `page` is sent as `?page=` when set.
#[async_trait]
pub trait CourseApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError>;
    async fn register(&self, registration: &Registration) -> Result<(), ApiError>;
    async fn my_user(&self) -> Result<User, ApiError>;

    async fn courses(&self, page: Option<u32>) -> Result<Paginated<Course>, ApiError>;
    async fn create_course(&self, course: &NewCourse) -> Result<Course, ApiError>;

    async fn enroll(&self, course_id: u64) -> Result<Enrollment, ApiError>;
    async fn my_enrollments(&self, page: Option<u32>) -> Result<Paginated<Enrollment>, ApiError>;
    async fn instructor_enrollments(&self, page: Option<u32>) -> Result<Paginated<Enrollment>, ApiError>;

    async fn create_grade(&self, grade: &NewGrade) -> Result<Grade, ApiError>;
    async fn course_grades(&self, course_id: u64, page: Option<u32>) -> Result<Vec<Grade>, ApiError>;
    async fn my_grades(&self, page: Option<u32>) -> Result<Vec<Grade>, ApiError>;

    async fn users(&self, page: Option<u32>) -> Result<Paginated<User>, ApiError>;
}

/// [`CourseApi`] over HTTP. The bearer token is read from the session
/// store on every request; no token means an anonymous request.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl HttpApi {
    pub fn new(config: &ApiConfig, store: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, path: &str, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let request = match self.store.token()? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let resp = request.send().await.map_err(|source| ApiError::Transport {
            endpoint: path.to_string(),
            source,
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|source| ApiError::Transport {
            endpoint: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            tracing::debug!("{} returned {}: {}", path, status, body);
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        Ok(body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, page: Option<u32>) -> Result<T, ApiError> {
        let mut request = self.client.get(self.url(path));
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        let body = self.send(path, request).await?;
        decode(path, &body)
    }

    async fn post<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .send(path, self.client.post(self.url(path)).json(payload))
            .await?;
        decode(path, &body)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Human-readable part of an error body: `detail`, `message`, or the first
/// field error.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    let field = object
        .get("detail")
        .or_else(|| object.get("message"))
        .or_else(|| object.values().next())?;

    match field {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl CourseApi for HttpApi {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        self.post("/api/token/", credentials).await
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let path = "/api/register/";
        self.send(path, self.client.post(self.url(path)).json(registration))
            .await?;
        Ok(())
    }

    async fn my_user(&self) -> Result<User, ApiError> {
        self.get("/api/my-user/", None).await
    }

    async fn courses(&self, page: Option<u32>) -> Result<Paginated<Course>, ApiError> {
        self.get("/api/courses/", page).await
    }

    async fn create_course(&self, course: &NewCourse) -> Result<Course, ApiError> {
        self.post("/api/courses/", course).await
    }

    async fn enroll(&self, course_id: u64) -> Result<Enrollment, ApiError> {
        self.post("/api/enroll/", &EnrollRequest { course: course_id }).await
    }

    async fn my_enrollments(&self, page: Option<u32>) -> Result<Paginated<Enrollment>, ApiError> {
        self.get("/api/my-enrollments/", page).await
    }

    async fn instructor_enrollments(&self, page: Option<u32>) -> Result<Paginated<Enrollment>, ApiError> {
        self.get("/api/my-courses-enrollments/", page).await
    }

    async fn create_grade(&self, grade: &NewGrade) -> Result<Grade, ApiError> {
        self.post("/api/grades/", grade).await
    }

    async fn course_grades(&self, course_id: u64, page: Option<u32>) -> Result<Vec<Grade>, ApiError> {
        let listing: Listing<Grade> = self
            .get(&format!("/api/grades/course/{}/", course_id), page)
            .await?;
        Ok(listing.into_results())
    }

    async fn my_grades(&self, page: Option<u32>) -> Result<Vec<Grade>, ApiError> {
        let listing: Listing<Grade> = self.get("/api/my-grades/", page).await?;
        Ok(listing.into_results())
    }

    async fn users(&self, page: Option<u32>) -> Result<Paginated<User>, ApiError> {
        self.get("/api/users/", page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_detail_key() {
        let body = r#"{"detail":"No active account found with the given credentials"}"#;
        assert_eq!(
            error_detail(body).as_deref(),
            Some("No active account found with the given credentials")
        );
    }

    #[test]
    fn test_error_detail_joins_field_errors() {
        let body = r#"{"username":["A user with that username already exists.","Too short."]}"#;
        assert_eq!(
            error_detail(body).as_deref(),
            Some("A user with that username already exists., Too short.")
        );
    }

    #[test]
    fn test_error_detail_ignores_non_json() {
        assert_eq!(error_detail("<html>502</html>"), None);
        assert_eq!(error_detail("[1,2]"), None);
    }

    #[test]
    fn test_decode_error_names_endpoint() {
        let err = decode::<User>("/api/my-user/", "{}").unwrap_err();
        assert!(matches!(err, ApiError::Decode { ref endpoint, .. } if endpoint == "/api/my-user/"));
    }
}
