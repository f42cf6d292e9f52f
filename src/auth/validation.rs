//! Input checks shared by the auth procedures.

use regex::Regex;

use crate::rpc::RpcError;

const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 32;
const NAME_MIN: usize = 3;
const NAME_MAX: usize = 255;
const EMAIL_MAX: usize = 255;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub(super) fn check_email(email_normalized: &str) -> Result<(), RpcError> {
    if email_normalized.chars().count() > EMAIL_MAX {
        return Err(RpcError::bad_request(format!(
            "email: must be at most {EMAIL_MAX} characters"
        )));
    }
    if !valid_email(email_normalized) {
        return Err(RpcError::bad_request("email: invalid email address"));
    }
    Ok(())
}

pub(super) fn check_password(password: &str) -> Result<(), RpcError> {
    check_length("password", password, PASSWORD_MIN, PASSWORD_MAX)
}

pub(super) fn check_name(name: &str) -> Result<(), RpcError> {
    check_length("name", name.trim(), NAME_MIN, NAME_MAX)
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), RpcError> {
    let len = value.chars().count();
    if len < min {
        return Err(RpcError::bad_request(format!(
            "{field}: must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(RpcError::bad_request(format!(
            "{field}: must be at most {max} characters"
        )));
    }
    Ok(())
}
