//! Credential helpers
//!
//! Password hashing, input validation for registration and password reset,
//! and generation of reset codes and tokens.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{Rng, RngCore};

use crate::error::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_RESET_PASSWORD_LEN: usize = 8;
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;
pub const PHONE_DIGITS: usize = 8;
pub const RESET_CODE_DIGITS: usize = 6;

/// Hours a login session stays valid
pub const SESSION_HOURS: i64 = 24 * 7;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC hash string
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(Error::Validation("invalid email address".into()));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<()> {
    let len = username.trim().chars().count();
    if !USERNAME_LEN.contains(&len) {
        return Err(Error::Validation(
            "username must be 3 to 30 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Stricter rule for passwords set through the reset flow
pub fn validate_reset_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_RESET_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            MIN_RESET_PASSWORD_LEN
        )));
    }
    let upper = password.chars().any(|c| c.is_uppercase());
    let lower = password.chars().any(|c| c.is_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !(upper && lower && digit) {
        return Err(Error::Validation(
            "password needs an uppercase letter, a lowercase letter and a digit".into(),
        ));
    }
    Ok(())
}

/// Phone numbers are exactly eight digits
pub fn validate_phone(phone: &str) -> Result<()> {
    if phone.len() != PHONE_DIGITS || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation("phone number must be 8 digits".into()));
    }
    Ok(())
}

/// Random zero-padded numeric code
pub fn generate_reset_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", n, width = RESET_CODE_DIGITS)
}

/// Opaque token handed out after a reset code is verified
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
