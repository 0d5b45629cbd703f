//! User domain types.
//!
//! `User` carries the stored hashes and never leaves the server; handlers
//! respond with [`PublicProfile`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use ecommerce_core::{Email, Role, UserId};

/// A registered account.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized login email.
    pub email: Email,
    /// Contact phone number.
    pub phone: String,
    /// Shipping address.
    pub address: String,
    /// Access level.
    pub role: Role,
    /// Argon2 hash of the password.
    pub password_hash: String,
    /// Argon2 hash of the security-question answer.
    pub answer_hash: String,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Fields for a new account, with secrets already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub password_hash: String,
    pub answer_hash: String,
}

/// Partial profile update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileChanges {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }

    /// Apply the changes to an in-memory user.
    pub fn apply_to(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(address) = self.address {
            user.address = address;
        }
    }
}

/// The client-visible part of a [`User`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicProfile {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub role: Role,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            role: user.role,
        }
    }
}
