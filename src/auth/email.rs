use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AccountError;

lazy_static! {
    static ref LOCAL_PART_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~.-]+$").expect("local part regex");
    static ref DOMAIN_RE: Regex = Regex::new(r"^[^\s]+\.[^\s]+$").expect("domain regex");
}

const MIN_LEN: usize = 6;
const MAX_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

/// Permissive syntactic check. The domain part is not checked against DNS rules.
pub fn validate(email: &str) -> Result<(), AccountError> {
    let email = email.trim();
    let len = email.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(AccountError::InvalidEmail);
    }

    let at = email.rfind('@').ok_or(AccountError::InvalidEmail)?;
    let (local, domain) = (&email[..at], &email[at + 1..]);
    if local.is_empty() || domain.len() < 2 {
        return Err(AccountError::InvalidEmail);
    }
    if local.chars().count() > MAX_LOCAL_LEN {
        return Err(AccountError::InvalidEmail);
    }

    if !LOCAL_PART_RE.is_match(local) || !DOMAIN_RE.is_match(domain) {
        return Err(AccountError::InvalidEmail);
    }
    Ok(())
}
