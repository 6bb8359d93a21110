use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Authorization tier. Wire values are mixed-case:
/// "Admin", "Shipper", "Carrier", "user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum Role {
    #[serde(rename = "Admin")]
    #[sqlx(rename = "Admin")]
    Admin,
    #[serde(rename = "Shipper")]
    #[sqlx(rename = "Shipper")]
    Shipper,
    #[serde(rename = "Carrier")]
    #[sqlx(rename = "Carrier")]
    Carrier,
    #[serde(rename = "user")]
    #[sqlx(rename = "user")]
    User,
}

impl Role {
    /// Allow-set check: the exact role passes, and Admin passes every gate.
    pub fn permits(self, required: Role) -> bool {
        self == required || self == Role::Admin
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Shipper => "Shipper",
            Role::Carrier => "Carrier",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Shipper" => Ok(Role::Shipper),
            "Carrier" => Ok(Role::Carrier),
            "user" => Ok(Role::User),
            _ => Err(()),
        }
    }
}

/// User record in the database. The password hash and any live one-time
/// codes never serialize into a response.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    #[serde(skip_serializing)]
    pub verification_code_expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
