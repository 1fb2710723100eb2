//! Local inspection of provider id tokens.
//!
//! Signatures are not checked here; the provider's `lookup` stays the authority. This
//! only lets a page load skip the network round-trip for a token that has already expired.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[allow(dead_code)]
    exp: u64,
}

/// `Some(true)` if the token's `exp` is in the past, `Some(false)` if it is still live,
/// `None` if the token cannot be read as a JWT.
pub fn is_expired(id_token: &str) -> Option<bool> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = true;
    validation.leeway = 0;

    match decode::<ExpiryClaims>(id_token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(_) => Some(false),
        Err(e) => match e.kind() {
            ErrorKind::ExpiredSignature => Some(true),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: u64,
    }

    fn token_with_exp(exp: u64) -> String {
        encode(
            &Header::default(),
            &Claims {
                sub: "uid-1".to_string(),
                exp,
            },
            &EncodingKey::from_secret(b"test"),
        )
        .expect("encode")
    }

    fn now() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    #[test]
    fn live_token_is_not_expired() {
        assert_eq!(is_expired(&token_with_exp(now() + 3600)), Some(false));
    }

    #[test]
    fn past_exp_is_expired() {
        assert_eq!(is_expired(&token_with_exp(now() - 3600)), Some(true));
    }

    #[test]
    fn opaque_token_is_unknown() {
        assert_eq!(is_expired("not-a-jwt"), None);
    }
}
