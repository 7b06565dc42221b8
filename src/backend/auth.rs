//! Credential auth: password hashing, bearer sessions and the request
//! extractor that resolves a session into the caller's profile.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::backend::AppState;
use crate::database::db::queries;
use crate::database::models::{Credentials, Profile, Role, Session, User};
use crate::error::{PlatformError, PlatformResult};

pub const MIN_PASSWORD_LEN: usize = 6;
const TOKEN_LEN: usize = 48;

pub fn hash_password(password: &str) -> PlatformResult<String> {
    let salt = SaltString::generate(&mut thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PlatformError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> PlatformResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| PlatformError::Internal(format!("stored hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_credentials(creds: &Credentials) -> PlatformResult<String> {
    let email = normalize_email(&creds.email);
    let valid_shape = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
        .unwrap_or(false);
    if !valid_shape {
        return Err(PlatformError::Validation("email address is invalid".into()));
    }
    if creds.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PlatformError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(email)
}

pub async fn sign_up(state: &AppState, creds: &Credentials) -> PlatformResult<User> {
    let email = check_credentials(creds)?;
    let role = if state.config.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::User
    };
    let hash = hash_password(&creds.password)?;
    let user_id = uuid::Uuid::new_v4().to_string();

    match queries::create_user(&state.db, &user_id, &email, &hash, role).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, %role, "user registered");
            Ok(user)
        }
        Err(e) if queries::is_unique_violation(&e) => {
            Err(PlatformError::Conflict("user already registered".into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn sign_in(state: &AppState, creds: &Credentials) -> PlatformResult<Session> {
    let invalid = || PlatformError::Unauthorized("invalid login credentials".into());

    let email = normalize_email(&creds.email);
    let record = queries::find_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&creds.password, &record.password_hash)? {
        return Err(invalid());
    }

    let token = generate_token();
    queries::create_session(&state.db, &token, &record.id).await?;
    tracing::info!(user_id = %record.id, "signed in");

    Ok(Session {
        access_token: token,
        user: record.into(),
    })
}

/// The signed-in caller. Rejects with 401 when the bearer token is missing
/// or unknown.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub token: String,
    pub user: User,
    pub profile: Profile,
}

impl AuthUser {
    pub fn require_admin(&self) -> PlatformResult<()> {
        if self.profile.role.is_admin() {
            Ok(())
        } else {
            Err(PlatformError::admin_only())
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(PlatformError::unauthorized)?;
        let user = queries::find_session_user(&state.db, token)
            .await?
            .ok_or_else(PlatformError::unauthorized)?;
        let profile = queries::get_profile(&state.db, &user.id)
            .await?
            .ok_or_else(|| PlatformError::NotFound("profile".into()))?;

        Ok(Self {
            token: token.to_string(),
            user,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trip() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("rahasia123", &hash).unwrap());
        assert!(!verify_password("rahasia124", &hash).unwrap());
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert_ne!(a, generate_token());
    }

    #[test]
    fn credential_shape_is_checked() {
        let creds = |email: &str, password: &str| Credentials {
            email: email.into(),
            password: password.into(),
        };
        assert_eq!(
            check_credentials(&creds("  Ani@Example.COM ", "secret")).unwrap(),
            "ani@example.com"
        );
        assert!(check_credentials(&creds("ani.example.com", "secret")).is_err());
        assert!(check_credentials(&creds("@example.com", "secret")).is_err());
        assert!(check_credentials(&creds("ani@example.com", "12345")).is_err());
    }
}
