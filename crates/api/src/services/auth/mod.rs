//! Authentication service.
//!
//! Registration, password login, security-question password reset, and
//! profile updates. Passwords and security answers are stored only as Argon2
//! hashes.
//!
//! Login reports unknown emails and wrong passwords with different messages
//! so existing clients keep working; this does reveal which emails have
//! accounts. The security-question reset has no rate limit and no one-time
//! token.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use tracing::instrument;

use ecommerce_core::{Email, UserId};

use crate::db::{RepositoryError, Store, UserStore};
use crate::models::{NewUser, ProfileChanges, User};
use crate::services::token::TokenCodec;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 4;

const PROFILE_PASSWORD_MESSAGE: &str =
    "Password is required and should be atleast 4 characters long";

/// Registration form. Every field is required.
#[derive(Debug, Default, Deserialize)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub answer: Option<String>,
}

/// Login form.
#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Security-question password reset form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub email: Option<String>,
    pub answer: Option<String>,
    pub new_password: Option<String>,
}

/// Partial profile update. Missing or blank fields keep the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A successful login.
#[derive(Debug)]
pub struct Login {
    pub user: User,
    pub token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenCodec,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, tokens: &'a TokenCodec) -> Self {
        Self { store, tokens }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` naming the first absent field,
    /// `AuthError::UserAlreadyExists` if the email is taken.
    #[instrument(skip(self, form))]
    pub async fn register(&self, form: Registration) -> Result<User, AuthError> {
        let name = required(form.name, "Name is required")?;
        let email = required(form.email, "Email is required")?;
        let password = required(form.password, "Password is required")?;
        let phone = required(form.phone, "Phone is required")?;
        let address = required(form.address, "Address is required")?;
        let answer = required(form.answer, "Answer is required")?;

        let email = Email::parse(&email)?;
        check_password_length(&password, "Password should be atleast 4 characters long")?;

        if self.store.user_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let user = self
            .store
            .insert_user(NewUser {
                name,
                email,
                phone,
                address,
                password_hash: hash_secret(&password)?,
                answer_hash: hash_secret(&answer)?,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check a password and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailNotRegistered` or `AuthError::InvalidPassword`
    /// on a failed login.
    #[instrument(skip(self, form))]
    pub async fn login(&self, form: Credentials) -> Result<Login, AuthError> {
        let (Some(email), Some(password)) = (non_blank(form.email), non_blank(form.password))
        else {
            return Err(AuthError::MissingField("Invalid email and password"));
        };

        let email = Email::parse(&email).map_err(|_| AuthError::EmailNotRegistered)?;
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AuthError::EmailNotRegistered)?;

        if !verify_secret(&password, &user.password_hash) {
            return Err(AuthError::InvalidPassword);
        }

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(Login { user, token })
    }

    /// Replace the password of the account whose email and security answer match.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WrongAnswer` if the email or answer does not match.
    #[instrument(skip(self, form))]
    pub async fn reset_password(&self, form: PasswordReset) -> Result<(), AuthError> {
        let email = required(form.email, "Email is required!")?;
        let answer = required(form.answer, "Answer is required!")?;
        let new_password = required(form.new_password, "New Password is required!")?;
        check_password_length(
            &new_password,
            "New Password should be atleast 4 characters long",
        )?;

        let email = Email::parse(&email).map_err(|_| AuthError::WrongAnswer)?;
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AuthError::WrongAnswer)?;

        if !verify_secret(&answer, &user.answer_hash) {
            return Err(AuthError::WrongAnswer);
        }

        self.store
            .set_password_hash(user.id, &hash_secret(&new_password)?)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` for a password under four characters
    /// and `AuthError::EmailInUse` if the new email belongs to someone else.
    #[instrument(skip(self, form))]
    pub async fn update_profile(&self, user: UserId, form: ProfileUpdate) -> Result<User, AuthError> {
        let password_hash = match non_blank(form.password) {
            Some(password) => {
                check_password_length(&password, PROFILE_PASSWORD_MESSAGE)?;
                Some(hash_secret(&password)?)
            }
            None => None,
        };
        let email = non_blank(form.email)
            .map(|e| Email::parse(&e))
            .transpose()?;

        let changes = ProfileChanges {
            name: non_blank(form.name),
            email,
            password_hash,
            phone: non_blank(form.phone),
            address: non_blank(form.address),
        };

        if changes.is_empty() {
            return self
                .store
                .user_by_id(user)
                .await?
                .ok_or(AuthError::UserNotFound);
        }

        self.store
            .update_profile(user, changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                RepositoryError::Conflict(_) => AuthError::EmailInUse,
                other => AuthError::Repository(other),
            })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, message: &'static str) -> Result<String, AuthError> {
    non_blank(value).ok_or(AuthError::MissingField(message))
}

fn check_password_length(password: &str, message: &'static str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(message));
    }
    Ok(())
}

/// Hash a password or security answer using Argon2id.
fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a secret against a stored hash.
fn verify_secret(secret: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use secrecy::SecretString;

    fn codec() -> TokenCodec {
        TokenCodec::new(&SecretString::from("q8Z!v2#Lr9@pX4$kW7^mN1&bT6*cY3(e"))
    }

    fn registration(email: &str) -> Registration {
        Registration {
            name: Some("Grace".to_owned()),
            email: Some(email.to_owned()),
            password: Some("hunter22".to_owned()),
            phone: Some("555-0199".to_owned()),
            address: Some("12 Harbor St".to_owned()),
            answer: Some("blue".to_owned()),
        }
    }

    #[test]
    fn test_hash_and_verify_secret() {
        let hash = hash_secret("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_secret("correct horse", &hash));
        assert!(!verify_secret("wrong horse", &hash));
        assert!(!verify_secret("anything", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_register_reports_first_missing_field() {
        let store = MemoryStore::new();
        let tokens = codec();
        let auth = AuthService::new(&store, &tokens);

        let mut form = registration("g@example.com");
        form.phone = None;
        form.answer = None;
        let err = auth.register(form).await.unwrap_err();
        assert_eq!(err.to_string(), "Phone is required");

        let mut form = registration("g@example.com");
        form.name = Some("   ".to_owned());
        let err = auth.register(form).await.unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
    }

    #[tokio::test]
    async fn test_register_twice_creates_one_user() {
        let store = MemoryStore::new();
        let tokens = codec();
        let auth = AuthService::new(&store, &tokens);

        let user = auth.register(registration("G@Example.com")).await.unwrap();
        assert_eq!(user.email.as_str(), "g@example.com");
        assert_ne!(user.password_hash, "hunter22");
        assert_ne!(user.answer_hash, "blue");

        let err = auth
            .register(registration("g@example.com "))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_login_messages_are_distinct() {
        let store = MemoryStore::new();
        let tokens = codec();
        let auth = AuthService::new(&store, &tokens);
        auth.register(registration("g@example.com")).await.unwrap();

        let missing = auth
            .login(Credentials {
                email: Some("g@example.com".to_owned()),
                password: None,
            })
            .await
            .unwrap_err();
        assert_eq!(missing.to_string(), "Invalid email and password");

        let unknown = auth
            .login(Credentials {
                email: Some("nobody@example.com".to_owned()),
                password: Some("hunter22".to_owned()),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, AuthError::EmailNotRegistered));

        let wrong = auth
            .login(Credentials {
                email: Some("g@example.com".to_owned()),
                password: Some("hunter23".to_owned()),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidPassword));

        let login = auth
            .login(Credentials {
                email: Some("g@example.com".to_owned()),
                password: Some("hunter22".to_owned()),
            })
            .await
            .unwrap();
        assert_eq!(tokens.verify(&login.token).unwrap(), login.user.id);
    }

    #[tokio::test]
    async fn test_reset_password_requires_matching_answer() {
        let store = MemoryStore::new();
        let tokens = codec();
        let auth = AuthService::new(&store, &tokens);
        let user = auth.register(registration("g@example.com")).await.unwrap();

        let err = auth
            .reset_password(PasswordReset {
                email: Some("g@example.com".to_owned()),
                answer: Some("red".to_owned()),
                new_password: Some("fresh-pass".to_owned()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongAnswer));
        let unchanged = store.user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(unchanged.password_hash, user.password_hash);

        auth.reset_password(PasswordReset {
            email: Some("g@example.com".to_owned()),
            answer: Some("blue".to_owned()),
            new_password: Some("fresh-pass".to_owned()),
        })
        .await
        .unwrap();

        let old = auth
            .login(Credentials {
                email: Some("g@example.com".to_owned()),
                password: Some("hunter22".to_owned()),
            })
            .await;
        assert!(matches!(old, Err(AuthError::InvalidPassword)));
        let new = auth
            .login(Credentials {
                email: Some("g@example.com".to_owned()),
                password: Some("fresh-pass".to_owned()),
            })
            .await;
        assert!(new.is_ok());
    }

    #[tokio::test]
    async fn test_empty_profile_update_keeps_everything() {
        let store = MemoryStore::new();
        let tokens = codec();
        let auth = AuthService::new(&store, &tokens);
        let user = auth.register(registration("g@example.com")).await.unwrap();

        let same = auth
            .update_profile(
                user.id,
                ProfileUpdate {
                    name: Some(String::new()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.name, "Grace");
        assert_eq!(same.phone, "555-0199");
        assert_eq!(same.password_hash, user.password_hash);
        assert_eq!(same.updated_at, user.updated_at);
    }

    #[tokio::test]
    async fn test_profile_rejects_short_password() {
        let store = MemoryStore::new();
        let tokens = codec();
        let auth = AuthService::new(&store, &tokens);
        let user = auth.register(registration("g@example.com")).await.unwrap();

        let err = auth
            .update_profile(
                user.id,
                ProfileUpdate {
                    password: Some("abc".to_owned()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), PROFILE_PASSWORD_MESSAGE);

        let updated = auth
            .update_profile(
                user.id,
                ProfileUpdate {
                    address: Some("99 New Rd".to_owned()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address, "99 New Rd");
        assert_eq!(updated.name, "Grace");
    }
}
