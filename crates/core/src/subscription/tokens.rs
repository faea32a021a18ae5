use chrono::{DateTime, Duration, Utc};
use rand::TryCryptoRng;

use super::{Token, TokenError, TokenKind};

/// Number of digits in a confirm or cancel code.
pub const TOKEN_CODE_LENGTH: usize = 6;

/// Lifetime of a confirm token.
pub const CONFIRM_TOKEN_TTL: Duration = Duration::hours(24);

/// Lifetime of a cancel token. Effectively non-expiring.
pub const CANCEL_TOKEN_TTL: Duration = Duration::days(3700);

/// Largest multiple of 10 that fits in a byte. Bytes at or above it are
/// rejected so every digit stays uniform over 0-9.
const DIGIT_REJECTION_BOUND: u8 = 250;

/// Upper bound on RNG reads for one code before giving up.
const MAX_FILL_ROUNDS: usize = 32;

/// Generate a numeric code of [`TOKEN_CODE_LENGTH`] digits.
///
/// Each digit is drawn independently and uniformly from 0-9 using
/// rejection sampling over random bytes.
///
/// # Errors
///
/// Returns [`TokenError::Generation`] if the random source fails or keeps
/// producing only rejected bytes.
pub fn generate_code<R: TryCryptoRng + ?Sized>(rng: &mut R) -> Result<String, TokenError> {
    let mut code = String::with_capacity(TOKEN_CODE_LENGTH);
    let mut buf = [0u8; 16];

    for _ in 0..MAX_FILL_ROUNDS {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| TokenError::Generation(e.to_string()))?;

        for byte in buf.iter().copied().filter(|b| *b < DIGIT_REJECTION_BOUND) {
            code.push(char::from(b'0' + byte % 10));
            if code.len() == TOKEN_CODE_LENGTH {
                return Ok(code);
            }
        }
    }

    Err(TokenError::Generation(
        "random source exhausted".to_string(),
    ))
}

/// Lifetime for a token of the given kind.
pub fn token_ttl(kind: TokenKind) -> Duration {
    match kind {
        TokenKind::Confirm => CONFIRM_TOKEN_TTL,
        TokenKind::Cancel => CANCEL_TOKEN_TTL,
    }
}

/// Calculate token expiry from issue time.
pub fn token_expiry(kind: TokenKind, issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + token_ttl(kind)
}

/// A token is expired once `now` reaches its expiry instant.
pub fn is_token_expired(token: &Token, now: DateTime<Utc>) -> bool {
    token.expires_at <= now
}
