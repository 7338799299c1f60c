//! Account and identifier validation shared by registration, profile edits and the API.

use std::collections::HashSet;

/// Username validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UsernameError {
    #[error("Username is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Username is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Username cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Username contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Username is a reserved name")]
    Reserved,
}

/// Profile field errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProfileError {
    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Display name must be 1-{max} printable characters")]
    InvalidDisplayName { max: usize },

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Password must be at most {max} characters")]
    PasswordTooLong { max: usize },

    #[error("Player id is not valid: {reason}")]
    InvalidPlayerId { reason: String },
}

/// Username validation rules configuration
#[derive(Debug, Clone)]
pub struct UsernameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_reserved_admin: bool,
}

impl UsernameRules {
    /// Rules for admin accounts created from the CLI
    pub fn admin() -> Self {
        UsernameRules {
            min_length: 2,
            max_length: 20,
            allow_reserved_admin: true,
        }
    }

    /// Rules for self-registered players
    pub fn player() -> Self {
        UsernameRules {
            min_length: 3,
            max_length: 24,
            allow_reserved_admin: false,
        }
    }
}

/// Get set of reserved usernames that should not be allowed
fn reserved_names() -> HashSet<&'static str> {
    [
        "admin", "administrator", "root", "system", "narrator", "guest", "anonymous",
        "codyssey", "api", "health", "me", "null", "undefined",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a username according to the given rules. Usernames double as
/// storage keys, so only ASCII letters, digits, `_`, `-` and `.` are accepted.
pub fn validate_username(username: &str, rules: &UsernameRules) -> Result<String, UsernameError> {
    let trimmed = username.trim();
    if trimmed != username {
        return Err(UsernameError::InvalidWhitespace);
    }
    if trimmed.chars().count() < rules.min_length {
        return Err(UsernameError::TooShort {
            min: rules.min_length,
        });
    }
    if trimmed.chars().count() > rules.max_length {
        return Err(UsernameError::TooLong {
            max: rules.max_length,
        });
    }

    let lower = trimmed.to_ascii_lowercase();
    if reserved_names().contains(lower.as_str()) && !(rules.allow_reserved_admin && lower == "admin")
    {
        return Err(UsernameError::Reserved);
    }

    let invalid: HashSet<char> = trimmed
        .chars()
        .filter(|ch| !(ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-' || *ch == '.'))
        .collect();
    if !invalid.is_empty() {
        let mut chars: Vec<char> = invalid.into_iter().collect();
        chars.sort_unstable();
        let chars = chars
            .into_iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("");
        return Err(UsernameError::InvalidCharacters { chars });
    }

    Ok(trimmed.to_string())
}

pub fn validate_player_name(name: &str) -> Result<String, UsernameError> {
    validate_username(name, &UsernameRules::player())
}

pub fn validate_admin_name(name: &str) -> Result<String, UsernameError> {
    validate_username(name, &UsernameRules::admin())
}

/// Minimal shape check: one `@`, something on both sides, a dot in the domain.
pub fn validate_email(email: &str) -> Result<String, ProfileError> {
    let trimmed = email.trim();
    let mut parts = trimmed.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(ProfileError::InvalidEmail),
    };
    if local.is_empty()
        || domain.len() < 3
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || trimmed.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(ProfileError::InvalidEmail);
    }
    Ok(trimmed.to_string())
}

pub fn validate_display_name(name: &str) -> Result<String, ProfileError> {
    const MAX: usize = 40;
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX || trimmed.chars().any(|c| c.is_control())
    {
        return Err(ProfileError::InvalidDisplayName { max: MAX });
    }
    Ok(trimmed.to_string())
}

pub fn validate_password(password: &str, min: usize, max: usize) -> Result<(), ProfileError> {
    let len = password.chars().count();
    if len < min {
        return Err(ProfileError::PasswordTooShort { min });
    }
    if len > max {
        return Err(ProfileError::PasswordTooLong { max });
    }
    Ok(())
}

/// Player ids prefix inventory and progress keys, so the key separator is not allowed.
pub fn validate_player_id(player_id: &str) -> Result<&str, ProfileError> {
    if player_id.is_empty() {
        return Err(ProfileError::InvalidPlayerId {
            reason: "empty".to_string(),
        });
    }
    if player_id.len() > 64 {
        return Err(ProfileError::InvalidPlayerId {
            reason: "longer than 64 bytes".to_string(),
        });
    }
    if player_id.contains(':') || player_id.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ProfileError::InvalidPlayerId {
            reason: "contains ':' or whitespace".to_string(),
        });
    }
    Ok(player_id)
}
