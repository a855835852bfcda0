//! HS256 bearer token verification

use anyhow::{Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;

use super::Claims;

/// Verifies tokens signed with the shared marketplace secret
#[derive(Clone)]
pub struct TokenVerifier {
    key: Arc<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        match issuer {
            Some(issuer) => {
                validation.set_required_spec_claims(&["exp", "sub", "iss"]);
                validation.set_issuer(&[issuer]);
            }
            None => validation.set_required_spec_claims(&["exp", "sub"]),
        }

        Self {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    /// Verify a JWT token and return the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data =
            decode::<Claims>(token, &self.key, &self.validation).context("JWT validation failed")?;
        Ok(token_data.claims)
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::{mint, SECRET};
    use super::*;

    #[test]
    fn accepts_valid_token() {
        let verifier = TokenVerifier::new(SECRET, None);
        let claims = verifier.verify_token(&mint("u1", "client", None, 600)).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role.as_deref(), Some("client"));
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = TokenVerifier::new(SECRET, None);
        assert!(verifier.verify_token(&mint("u1", "client", None, -600)).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = TokenVerifier::new("another-secret", None);
        assert!(verifier.verify_token(&mint("u1", "client", None, 600)).is_err());
    }

    #[test]
    fn enforces_configured_issuer() {
        let verifier = TokenVerifier::new(SECRET, Some("connect-accel"));
        assert!(verifier
            .verify_token(&mint("u1", "client", Some("connect-accel"), 600))
            .is_ok());
        assert!(verifier
            .verify_token(&mint("u1", "client", Some("elsewhere"), 600))
            .is_err());
        assert!(verifier.verify_token(&mint("u1", "client", None, 600)).is_err());
    }
}
