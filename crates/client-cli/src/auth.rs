//! Login, registration and logout against the course API

use crate::api::CourseApi;
use crate::error::{ActionError, ValidationError};
use crate::storage::{PersistedSession, SessionStore};
use shared::{Credentials, Registration, Role, User};

/// Exchange credentials for a token pair, persist it, then resolve and
/// cache the user. Returns the user so the caller can pick a dashboard.
pub async fn login(
    api: &dyn CourseApi,
    store: &dyn SessionStore,
    username: &str,
    password: &str,
) -> Result<User, ActionError> {
    if username.trim().is_empty() {
        return Err(ValidationError::new("username", "is required").into());
    }
    if password.is_empty() {
        return Err(ValidationError::new("password", "is required").into());
    }

    let tokens = api
        .login(&Credentials {
            username: username.trim().to_string(),
            password: password.to_string(),
        })
        .await?;

    // a new login replaces whatever was cached before
    store.save(&PersistedSession {
        token: Some(tokens.access),
        refresh_token: Some(tokens.refresh),
        user: None,
    })?;

    let user = match api.my_user().await {
        Ok(user) => user,
        Err(e) => {
            store.clear()?;
            return Err(e.into());
        }
    };
    store.update(&mut |session| session.user = Some(user.clone()))?;

    tracing::info!("Logged in as {} ({})", user.username, user.role);
    Ok(user)
}

/// Validated registration form
#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, ValidationError> {
        let username = self.username.trim();
        let len = username.chars().count();
        if !(2..=50).contains(&len) {
            return Err(ValidationError::new("username", "must be between 2 and 50 characters"));
        }
        let len = self.password.chars().count();
        if !(8..=50).contains(&len) {
            return Err(ValidationError::new("password", "must be between 8 and 50 characters"));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::new("confirm_password", "passwords do not match"));
        }

        Ok(Registration {
            username: username.to_string(),
            password: self.password.clone(),
            role: self.role,
        })
    }
}

pub async fn register(api: &dyn CourseApi, form: &RegisterForm) -> Result<(), ActionError> {
    let registration = form.validate()?;
    api.register(&registration).await?;
    tracing::info!("Registered {} as {}", registration.username, registration.role);
    Ok(())
}

/// Logout by clearing the stored session
pub fn logout(store: &dyn SessionStore) -> Result<(), ActionError> {
    store.clear()?;
    Ok(())
}

/// Cached identity, if a session is stored
pub fn whoami(store: &dyn SessionStore) -> Result<Option<User>, ActionError> {
    let session = store.load()?;
    Ok(session.token.and(session.user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySessionStore;

    fn form() -> RegisterForm {
        RegisterForm {
            username: "dana".to_string(),
            password: "correct horse".to_string(),
            confirm_password: "correct horse".to_string(),
            role: Role::Student,
        }
    }

    #[test]
    fn test_register_form_accepts_valid_input() {
        let registration = form().validate().unwrap();
        assert_eq!(registration.username, "dana");
        assert_eq!(registration.role, Role::Student);
    }

    #[test]
    fn test_register_form_rejects_bad_input() {
        let mut short_name = form();
        short_name.username = "d".to_string();
        assert_eq!(short_name.validate().unwrap_err().field, "username");

        let mut short_password = form();
        short_password.password = "short".to_string();
        short_password.confirm_password = "short".to_string();
        assert_eq!(short_password.validate().unwrap_err().field, "password");

        let mut mismatch = form();
        mismatch.confirm_password = "something else".to_string();
        assert_eq!(mismatch.validate().unwrap_err().field, "confirm_password");
    }

    #[test]
    fn test_whoami_needs_token() {
        let user = User {
            id: 1,
            username: "dana".to_string(),
            role: Role::Student,
        };
        let store = MemorySessionStore::new(PersistedSession {
            token: None,
            refresh_token: None,
            user: Some(user.clone()),
        });
        assert_eq!(whoami(&store).unwrap(), None);

        store.update(&mut |s| s.token = Some("t".to_string())).unwrap();
        assert_eq!(whoami(&store).unwrap(), Some(user));

        logout(&store).unwrap();
        assert_eq!(whoami(&store).unwrap(), None);
    }
}
