use crate::error::MissingTokenError;

const BEARER_SCHEME: &str = "bearer";

/// Token part of an `Authorization: Bearer <token>` header value.
///
/// Scheme is case-insensitive, separated by exactly one space, and the token
/// segment must be non-empty and contain no further spaces.
pub fn extract_bearer_token(authorization_header: Option<&str>) -> Result<&str, MissingTokenError> {
    let header = authorization_header.ok_or(MissingTokenError)?;
    let (scheme, token) = header.split_once(' ').ok_or(MissingTokenError)?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || token.is_empty() || token.contains(' ') {
        return Err(MissingTokenError);
    }
    Ok(token)
}
