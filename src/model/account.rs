use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Access level carried by the session.
///
/// The API stores free-form role strings; anything other than `admin`
/// (case-insensitive) is treated as a regular user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub id: Option<i64>,
    pub username: String,
    pub role: String,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRecord {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub action: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogPage {
    pub skip: u32,
    pub limit: u32,
    pub logs: Vec<LogRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub id: Option<i64>,
    pub username: String,
    pub role: String,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Me {
    pub username: String,
    pub role: String,
}

/// `/dashboard/stats`; admins get `total_riders`, users get their own `username`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub role: Option<String>,
    pub username: Option<String>,
    pub total_riders: Option<u64>,
    pub total_hours: Value,
    pub avg_hours: Value,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub role: String,
}

/// `/generate-reset-token`; the token is short-lived.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ResetTokenResponse {
    pub reset_token: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_normalizes_case_and_unknown_values() {
        assert_eq!(Role::parse("ADMIN"), Role::Admin);
        assert_eq!(Role::parse(" Admin "), Role::Admin);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("regular"), Role::User);
        assert_eq!(Role::parse(""), Role::User);
    }

    #[test]
    fn role_round_trips_through_serde_as_lowercase() {
        let role: Role = serde_json::from_str("\"Admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"admin\"");
    }

    #[test]
    fn stats_accept_user_shape_without_riders() {
        let stats: DashboardStats = serde_json::from_str(
            r#"{"role":"user","username":"ali","total_hours":12,"avg_hours":6.0}"#,
        )
        .unwrap();
        assert_eq!(stats.total_riders, None);
        assert_eq!(stats.username.as_deref(), Some("ali"));
    }
}
