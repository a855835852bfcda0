use super::Claims;
use crate::domain::UserRole;

/// Authenticated user context extracted from JWT
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (from JWT sub claim)
    pub user_id: String,

    /// User email if available
    pub email: Option<String>,

    /// Marketplace role, `client` when the token carries none
    pub role: UserRole,

    /// Raw JWT token, forwarded to the marketplace API
    token: String,
}

impl AuthContext {
    pub fn from_claims_with_token(claims: &Claims, token: &str) -> Result<Self, &'static str> {
        if claims.sub.trim().is_empty() {
            return Err("Missing user ID in token");
        }

        Ok(Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            role: claims
                .role
                .as_deref()
                .map(UserRole::from_claim)
                .unwrap_or_default(),
            token: token.to_string(),
        })
    }

    /// Get the raw JWT token
    pub fn token(&self) -> &str {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: Option<&str>) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: 0,
            iat: None,
            iss: None,
            email: Some("ada@example.com".into()),
            role: role.map(String::from),
        }
    }

    #[test]
    fn builds_context_with_role() {
        let ctx = AuthContext::from_claims_with_token(&claims("u1", Some("Agent")), "tok").unwrap();
        assert_eq!(ctx.user_id, "u1");
        assert_eq!(ctx.role, UserRole::Agent);
        assert!(ctx.role.is_staff());
        assert_eq!(ctx.token(), "tok");
    }

    #[test]
    fn missing_role_defaults_to_client() {
        let ctx = AuthContext::from_claims_with_token(&claims("u1", None), "tok").unwrap();
        assert_eq!(ctx.role, UserRole::Client);
    }

    #[test]
    fn blank_subject_is_rejected() {
        assert!(AuthContext::from_claims_with_token(&claims(" ", None), "tok").is_err());
    }
}
