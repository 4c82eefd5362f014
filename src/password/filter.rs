//! Password acceptance rules

/// Longest password kept in the models.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Minimum length for passwords that contain a letter.
const MIN_ALPHA_LEN: usize = 8;

/// Minimum length for letterless passwords (6 digits covers `ddmmyy` dates).
const MIN_NON_ALPHA_LEN: usize = 6;

/// A password is legal when it is non-empty, no longer than
/// [`MAX_PASSWORD_LEN`], and made of printable ASCII without whitespace.
pub fn is_legal_password(password: &str) -> bool {
    if password.is_empty() || password.len() > MAX_PASSWORD_LEN {
        return false;
    }
    password.chars().all(|c| c.is_ascii_graphic())
}

/// Passwords with letters need at least 8 characters; letterless ones
/// (usually dates or PINs) need at least 6.
pub fn is_short_and_not_date(password: &str) -> bool {
    let len = password.chars().count();
    if password.chars().any(char::is_alphabetic) {
        len < MIN_ALPHA_LEN
    } else {
        len < MIN_NON_ALPHA_LEN
    }
}
