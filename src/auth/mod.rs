//! Accounts and sessions.
//!
//! Passwords are hashed with Argon2id (parameters optionally tuned from
//! `[security.argon2]`). A successful login mints an opaque UUID session
//! token with an expiry; the API accepts it as a bearer token or cookie.
//! Logins, failed logins and account changes are logged on the `security`
//! target so they land in the separate security log.

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{Duration, Utc};
use log::{info, warn};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::content::progress;
use crate::content::{ContentStore, SessionRecord, StoreError, UserRecord, UserRole};
use crate::logutil::{escape_log, redact_token};
use crate::validation::{
    validate_admin_name, validate_display_name, validate_email, validate_password,
    validate_player_name, ProfileError, UsernameError,
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),
    #[error(transparent)]
    InvalidUsername(#[from] UsernameError),
    #[error(transparent)]
    InvalidProfile(#[from] ProfileError),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Account view without the password hash; this is what the API returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
}

impl From<&UserRecord> for PublicUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}

pub struct AuthService {
    store: Arc<ContentStore>,
    argon2: Argon2<'static>,
    session_ttl: Duration,
    min_password: usize,
    max_password: usize,
}

impl AuthService {
    pub fn new(store: Arc<ContentStore>, security: &SecurityConfig) -> Result<Self, AuthError> {
        let argon2 = match &security.argon2 {
            Some(a) => {
                let base = Params::DEFAULT;
                let params = Params::new(
                    a.memory_kib.unwrap_or(base.m_cost()),
                    a.time_cost.unwrap_or(base.t_cost()),
                    a.parallelism.unwrap_or(base.p_cost()),
                    None,
                )
                .map_err(|e| AuthError::Hash(format!("invalid argon2 params: {e}")))?;
                Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            }
            None => Argon2::default(),
        };
        Ok(Self {
            store,
            argon2,
            session_ttl: security.session_ttl(),
            min_password: security.min_password_length,
            max_password: security.max_password_length,
        })
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, user: &UserRecord, password: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AuthError::Hash(format!("corrupt password hash: {e}")))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.store.find(&UserRecord::key_for(username))?)
    }

    pub fn user(&self, username: &str) -> Result<UserRecord, AuthError> {
        Ok(self.store.get(&UserRecord::key_for(username))?)
    }

    /// Create a player account and start it on the first subquest.
    pub fn register(&self, req: &RegisterRequest) -> Result<UserRecord, AuthError> {
        let username = validate_player_name(&req.username)?;
        let email = validate_email(&req.email)?;
        let display_name = match &req.display_name {
            Some(name) => validate_display_name(name)?,
            None => username.clone(),
        };
        validate_password(&req.password, self.min_password, self.max_password)?;

        let user = UserRecord {
            user_id: uuid::Uuid::new_v4().to_string(),
            username: username.clone(),
            email,
            display_name,
            password_hash: self.hash_password(&req.password)?,
            role: UserRole::Player,
            created_at: Utc::now(),
            last_login: None,
        };
        if !self.store.insert_new(&user)? {
            warn!(target: "security", "Registration rejected, username taken: {}", escape_log(&username));
            return Err(AuthError::UsernameTaken(username));
        }
        progress::start_first_subquest(&self.store, &user.user_id)?;
        info!(target: "security", "Registered player {} ({})", escape_log(&username), user.user_id);
        Ok(user)
    }

    /// Create an admin account, or promote an existing one and reset its password.
    pub fn create_admin(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let username = validate_admin_name(username)?;
        validate_password(password, self.min_password, self.max_password)?;
        let password_hash = self.hash_password(password)?;
        let user = match self.find_user(&username)? {
            Some(mut existing) => {
                existing.role = UserRole::Admin;
                existing.password_hash = password_hash;
                existing
            }
            None => UserRecord {
                user_id: uuid::Uuid::new_v4().to_string(),
                username: username.clone(),
                email: format!("{}@codyssey.local", username.to_ascii_lowercase()),
                display_name: username.clone(),
                password_hash,
                role: UserRole::Admin,
                created_at: Utc::now(),
                last_login: None,
            },
        };
        self.store.put(&user)?;
        info!(target: "security", "Admin account set for {}", escape_log(&username));
        Ok(user)
    }

    /// Check credentials and open a session.
    pub fn login(&self, username: &str, password: &str) -> Result<(UserRecord, SessionRecord), AuthError> {
        let Some(mut user) = self.find_user(username)? else {
            warn!(target: "security", "Failed login for unknown user {}", escape_log(username));
            return Err(AuthError::InvalidCredentials);
        };
        if !self.verify_password(&user, password)? {
            warn!(target: "security", "Failed login for {}", escape_log(&user.username));
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        user.last_login = Some(now);
        self.store.put(&user)?;

        let session = SessionRecord {
            token: uuid::Uuid::new_v4().to_string(),
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            role: user.role,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.store.put(&session)?;
        info!(
            target: "security",
            "Login {} session {}",
            escape_log(&user.username),
            redact_token(&session.token)
        );
        Ok((user, session))
    }

    /// Returns whether a session was removed.
    pub fn logout(&self, token: &str) -> Result<bool, AuthError> {
        let removed = self.store.delete::<SessionRecord>(token)?;
        if removed {
            info!(target: "security", "Logout session {}", redact_token(token));
        }
        Ok(removed)
    }

    /// Resolve a live session. Expired sessions, and sessions whose account
    /// is gone, are deleted on sight. The role is read from the account so a
    /// promotion applies to sessions that are already open.
    pub fn session(&self, token: &str) -> Result<SessionRecord, AuthError> {
        let mut session = self
            .store
            .find::<SessionRecord>(token)?
            .ok_or(AuthError::SessionNotFound)?;
        if session.is_expired(Utc::now()) {
            self.store.delete::<SessionRecord>(token)?;
            return Err(AuthError::SessionExpired);
        }
        let Some(user) = self.find_user(&session.username)? else {
            self.store.delete::<SessionRecord>(token)?;
            return Err(AuthError::SessionNotFound);
        };
        session.role = user.role;
        Ok(session)
    }

    /// Drop every expired session; returns how many were removed.
    pub fn purge_expired_sessions(&self) -> Result<usize, AuthError> {
        let now = Utc::now();
        let mut removed = 0;
        for session in self.store.list::<SessionRecord>()? {
            if session.is_expired(now) && self.store.delete::<SessionRecord>(&session.token)? {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Purged {} expired sessions", removed);
        }
        Ok(removed)
    }

    pub fn update_profile(&self, username: &str, update: &ProfileUpdate) -> Result<UserRecord, AuthError> {
        let mut user = self.user(username)?;
        if let Some(email) = &update.email {
            user.email = validate_email(email)?;
        }
        if let Some(name) = &update.display_name {
            user.display_name = validate_display_name(name)?;
        }
        self.store.put(&user)?;
        Ok(user)
    }

    /// Change a password after checking the current one. Other sessions of the
    /// user are revoked; `keep_token` stays valid.
    pub fn change_password(
        &self,
        username: &str,
        current: &str,
        new_password: &str,
        keep_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut user = self.user(username)?;
        if !self.verify_password(&user, current)? {
            warn!(target: "security", "Password change with wrong password for {}", escape_log(username));
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new_password, self.min_password, self.max_password)?;
        user.password_hash = self.hash_password(new_password)?;
        self.store.put(&user)?;

        for session in self.store.list::<SessionRecord>()? {
            if session.user_id == user.user_id && Some(session.token.as_str()) != keep_token {
                self.store.delete::<SessionRecord>(&session.token)?;
            }
        }
        info!(target: "security", "Password changed for {}", escape_log(username));
        Ok(())
    }
}
