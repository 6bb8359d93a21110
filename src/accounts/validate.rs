use lazy_static::lazy_static;
use regex::Regex;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Strength policy: at least 6 chars with one lowercase, one uppercase,
/// one digit and one symbol.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 6
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric())
}

pub const PASSWORD_POLICY_MESSAGE: &str = "Password must be at least 6 characters long and \
     include at least one lowercase letter, one uppercase letter, one number, and one special character";
