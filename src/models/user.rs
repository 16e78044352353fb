use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::{AppError, AppResult};

/// A registered user. The graph core only relies on `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: NaiveDate,
}

/// Payload for registering a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub birthday: NaiveDate,
}

impl NewUser {
    /// Checks the payload and returns the display name to store.
    ///
    /// A missing or blank name falls back to the login.
    pub fn validate(&self) -> AppResult<String> {
        if !self.email.contains('@') {
            return Err(AppError::InvalidInput(format!(
                "email '{}' is not a valid address",
                self.email
            )));
        }

        if self.login.is_empty() || self.login.chars().any(char::is_whitespace) {
            return Err(AppError::InvalidInput(
                "login must be non-empty and contain no whitespace".to_string(),
            ));
        }

        if self.birthday > Utc::now().date_naive() {
            return Err(AppError::InvalidInput(
                "birthday cannot be in the future".to_string(),
            ));
        }

        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.login.clone(),
        };

        Ok(name)
    }

    pub fn into_user(self, id: UserId) -> AppResult<User> {
        let name = self.validate()?;
        Ok(User {
            id,
            email: self.email,
            login: self.login,
            name,
            birthday: self.birthday,
        })
    }
}
