use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Store-assigned user identity.
pub type UserId = i64;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String, // bcrypt or argon2 PHC string, not exposed in JSON
    pub is_admin: bool,
    pub must_change_password: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields handed to the store on insert. The id and timestamp are assigned there.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub must_change_password: bool,
}
