//! Field-level checks shared by the request handlers.
//!
//! Each function returns the normalized value or a `Validation` error whose
//! message is safe to show to the client.

use url::Url;

use crate::error::JambleError;
use crate::types::user::MAX_FAVORITE_ALBUMS;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 8;
/// bcrypt only looks at the first 72 bytes.
pub const PASSWORD_MAX_BYTES: usize = 72;
pub const BIO_MAX: usize = 255;
pub const POST_CONTENT_MAX: usize = 1000;
pub const REFERENCE_ID_MAX: usize = 128;

pub fn username(raw: &str) -> Result<String, JambleError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(JambleError::validation(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters long"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(JambleError::validation(
            "Username may only contain letters, digits, '_' and '.'",
        ));
    }
    Ok(name.to_string())
}

/// Lower-cases and checks the general `local@domain.tld` shape.
pub fn email(raw: &str) -> Result<String, JambleError> {
    let email = raw.trim().to_lowercase();
    let invalid = || JambleError::validation("A valid email address is required");
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || email.len() > 254
    {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && tld.len() >= 2 => Ok(email),
        _ => Err(invalid()),
    }
}

pub fn password(raw: &str) -> Result<(), JambleError> {
    if raw.chars().count() < PASSWORD_MIN {
        return Err(JambleError::validation(format!(
            "Password must be at least {PASSWORD_MIN} characters long"
        )));
    }
    if raw.len() > PASSWORD_MAX_BYTES {
        return Err(JambleError::validation(format!(
            "Password must be at most {PASSWORD_MAX_BYTES} bytes long"
        )));
    }
    Ok(())
}

/// Empty input clears the field.
pub fn bio(raw: &str) -> Result<Option<String>, JambleError> {
    let bio = raw.trim();
    if bio.is_empty() {
        return Ok(None);
    }
    if bio.chars().count() > BIO_MAX {
        return Err(JambleError::validation(format!(
            "Bio must be at most {BIO_MAX} characters long"
        )));
    }
    Ok(Some(bio.to_string()))
}

/// Empty input clears the field; otherwise an absolute http(s) URL.
pub fn image_url(field: &str, raw: &str) -> Result<Option<String>, JambleError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(url.to_string())),
        _ => Err(JambleError::validation(format!(
            "{field} must be an http(s) URL"
        ))),
    }
}

pub fn favorite_albums(raw: Vec<String>) -> Result<Vec<String>, JambleError> {
    if raw.len() > MAX_FAVORITE_ALBUMS {
        return Err(JambleError::validation(format!(
            "You can only select up to {MAX_FAVORITE_ALBUMS} favorite albums"
        )));
    }
    raw.into_iter()
        .map(|album| {
            let album = album.trim().to_string();
            if album.is_empty() {
                Err(JambleError::validation("Favorite albums cannot be empty"))
            } else {
                Ok(album)
            }
        })
        .collect()
}

pub fn post_content(raw: &str) -> Result<String, JambleError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(JambleError::validation("content is required"));
    }
    if content.chars().count() > POST_CONTENT_MAX {
        return Err(JambleError::validation(format!(
            "content must be at most {POST_CONTENT_MAX} characters long"
        )));
    }
    Ok(content.to_string())
}

pub fn reference_id(raw: &str) -> Result<String, JambleError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(JambleError::validation("reference_id is required"));
    }
    if id.len() > REFERENCE_ID_MAX || id.chars().any(char::is_whitespace) {
        return Err(JambleError::validation(
            "reference_id must be a single token of at most 128 characters",
        ));
    }
    Ok(id.to_string())
}
