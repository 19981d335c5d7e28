use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

pub fn hash_pass(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed_password = match Argon2::default().hash_password(password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(err) => return Err(err.to_string()),
    };

    Ok(hashed_password)
}

pub fn password_matches(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(err) => return Err(err.to_string()),
    };

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Strength rule a candidate password must pass before it is accepted.
/// Failures are reported as short reason codes in the field-error map.
pub struct PasswordRule {
    min_length: usize,
}

impl PasswordRule {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn validate(&self, password: &str) -> Result<(), &'static str> {
        if password.chars().count() < self.min_length {
            return Err("length");
        }

        Ok(())
    }
}
