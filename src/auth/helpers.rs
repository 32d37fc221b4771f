use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;

use super::{TokenGenerator, parse_token};
use crate::store::Store;
use crate::types::{Token, User};

#[derive(Debug, PartialEq, Eq)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

pub struct ValidatedToken {
    pub token: Token,
    pub user: Option<User>,
}

/// Extracts a token from a Basic auth header of the form
/// `Basic base64(token:<raw token>)`, as sent by `curl -u token:...`.
fn extract_basic_auth_token(header: &str) -> Option<String> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, password) = credentials.split_once(':')?;
    if username != "token" || password.is_empty() {
        return None;
    }

    Some(password.to_string())
}

/// Extracts the raw token from an Authorization header (Bearer or Basic).
/// `Ok(None)` means no header was sent at all.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> Result<Option<String>, TokenValidationError> {
    let Some(header) = auth_header else {
        return Ok(None);
    };

    if let Some(raw) = header.strip_prefix("Bearer ") {
        return Ok(Some(raw.trim().to_string()));
    }

    if header.starts_with("Basic ") {
        return extract_basic_auth_token(header)
            .ok_or(TokenValidationError::InvalidToken)
            .map(Some);
    }

    Err(TokenValidationError::InvalidScheme)
}

/// Validates a raw token string against the store and resolves its user.
pub fn validate_token(
    store: &dyn Store,
    raw_token: &str,
) -> Result<ValidatedToken, TokenValidationError> {
    let (lookup, _secret) =
        parse_token(raw_token).map_err(|_| TokenValidationError::InvalidToken)?;

    let token = store
        .get_token_by_lookup(&lookup)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    let generator = TokenGenerator::new().map_err(|_| TokenValidationError::InternalError)?;
    if !generator
        .verify(raw_token, &token.token_hash)
        .map_err(|_| TokenValidationError::InternalError)?
    {
        return Err(TokenValidationError::InvalidToken);
    }

    if token.expires_at.is_some_and(|expires_at| expires_at < Utc::now()) {
        return Err(TokenValidationError::TokenExpired);
    }

    let user = match &token.user_id {
        Some(user_id) => store
            .get_user(user_id)
            .map_err(|_| TokenValidationError::InternalError)?,
        None => None,
    };

    if let Err(e) = store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(ValidatedToken { token, user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    use crate::store::SqliteStore;

    fn store(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("auth.db")).unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_header_schemes() {
        assert_eq!(extract_token_from_header(None), Ok(None));
        assert_eq!(
            extract_token_from_header(Some("Bearer abc")),
            Ok(Some("abc".to_string()))
        );

        let basic = format!("Basic {}", STANDARD.encode("token:abc"));
        assert_eq!(
            extract_token_from_header(Some(&basic)),
            Ok(Some("abc".to_string()))
        );

        let wrong_user = format!("Basic {}", STANDARD.encode("admin:abc"));
        assert_eq!(
            extract_token_from_header(Some(&wrong_user)),
            Err(TokenValidationError::InvalidToken)
        );
        assert_eq!(
            extract_token_from_header(Some("Digest abc")),
            Err(TokenValidationError::InvalidScheme)
        );
    }

    #[test]
    fn test_validate_rejects_expired_and_unknown_tokens() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let generator = TokenGenerator::new().unwrap();

        let (admin, raw_admin) = generator.issue(true, None, None).unwrap();
        store.create_token(&admin).unwrap();
        let validated = validate_token(&store, &raw_admin).unwrap();
        assert!(validated.token.is_admin);
        assert!(validated.user.is_none());

        let expired_at = Utc::now() - Duration::hours(1);
        let (expired, raw_expired) = generator.issue(true, None, Some(expired_at)).unwrap();
        store.create_token(&expired).unwrap();
        assert!(matches!(
            validate_token(&store, &raw_expired),
            Err(TokenValidationError::TokenExpired)
        ));

        assert!(matches!(
            validate_token(&store, "promokit_12345678_123456789012345678901234"),
            Err(TokenValidationError::InvalidToken)
        ));
        assert!(matches!(
            validate_token(&store, "garbage"),
            Err(TokenValidationError::InvalidToken)
        ));
    }
}
