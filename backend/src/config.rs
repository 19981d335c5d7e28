use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier type used to locate the account a recovery is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Username,
    Email,
    Phone,
}

impl LoginMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl FromStr for LoginMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "username" => Ok(Self::Username),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            _ => Err(format!("Unknown login method ({})", value)),
        }
    }
}

/// Deployment configuration of the recovery flow. Built once at startup and
/// handed to the handlers through `AppState`; handlers never consult a
/// global registry.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    pub login_method: LoginMethod,
    pub code_length: usize,
    /// Token lifetime in seconds.
    pub token_expiration: i64,
    /// Failed confirm attempts after which a record is permanently blocked.
    pub max_attempts: i32,
    /// Surface `not_found` instead of faking success for unknown accounts.
    pub validate_login_not_found: bool,
    /// Reject contact values that do not match the ones on file.
    pub validate_contact_mismatch: bool,
    /// Expect a `password1`/`password2` pair instead of a single `password`.
    pub require_password_confirmation: bool,
    pub phone_allow_nanp: bool,
    pub phone_allow_e164: bool,
    pub phone_allow_formatting: bool,
    pub password_min_length: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            login_method: LoginMethod::Username,
            code_length: 6,
            token_expiration: 3600,
            max_attempts: 5,
            validate_login_not_found: false,
            validate_contact_mismatch: true,
            require_password_confirmation: false,
            phone_allow_nanp: true,
            phone_allow_e164: true,
            phone_allow_formatting: true,
            password_min_length: 12,
        }
    }
}

impl RecoveryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            login_method: env_parse("RECOVERY_LOGIN_METHOD", defaults.login_method),
            code_length: env_parse("RECOVERY_CODE_LENGTH", defaults.code_length),
            token_expiration: env_parse("RECOVERY_TOKEN_EXPIRATION", defaults.token_expiration),
            max_attempts: env_parse("RECOVERY_MAX_ATTEMPTS", defaults.max_attempts),
            validate_login_not_found: env_parse(
                "RECOVERY_VALIDATE_LOGIN_NOT_FOUND",
                defaults.validate_login_not_found,
            ),
            validate_contact_mismatch: env_parse(
                "RECOVERY_VALIDATE_CONTACT_MISMATCH",
                defaults.validate_contact_mismatch,
            ),
            require_password_confirmation: env_parse(
                "RECOVERY_REQUIRE_PASSWORD_CONFIRMATION",
                defaults.require_password_confirmation,
            ),
            phone_allow_nanp: env_parse("PHONE_ALLOW_NANP", defaults.phone_allow_nanp),
            phone_allow_e164: env_parse("PHONE_ALLOW_E164", defaults.phone_allow_e164),
            phone_allow_formatting: env_parse(
                "PHONE_ALLOW_FORMATTING",
                defaults.phone_allow_formatting,
            ),
            password_min_length: env_parse("PASSWORD_MIN_LENGTH", defaults.password_min_length),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_err) => {
                log::warn!("Invalid value for {}, using default", key);
                default
            }
        },
        Err(_err) => default,
    }
}
