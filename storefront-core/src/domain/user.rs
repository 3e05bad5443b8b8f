//! User profile domain model

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::result::{Error, Result};

/// Account role as reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// Represents an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: Role::Customer,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Extract a profile from an auth response body
    ///
    /// Accepts `{user: {...}, message}` as well as the flattened
    /// `{...profile, message}` shape. Returns `Ok(None)` when the body
    /// carries no profile at all (e.g. a bare `{message}`).
    pub fn from_response(body: &JsonValue) -> Result<Option<Self>> {
        let candidate = match body.get("user") {
            Some(JsonValue::Null) | None => body,
            Some(nested) => nested,
        };

        let has_identity = candidate.get("email").is_some()
            && (candidate.get("id").is_some() || candidate.get("_id").is_some());
        if !has_identity {
            return Ok(None);
        }

        serde_json::from_value(candidate.clone())
            .map(Some)
            .map_err(|e| Error::Decode(format!("Invalid user profile: {}", e)))
    }
}
